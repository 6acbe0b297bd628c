//! Interpretation: one candidate symbol held as a graph vertex.

use nalgebra::Point2;

/// Identifier of an interpretation, unique within its region's graph and
/// stable for the region's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterId(pub u32);

impl std::fmt::Display for InterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a staff within its owning region.
///
/// Interpretations keep this plain index as a weak back-reference to their
/// staff: lookup only, never ownership, so no cycle between staff and
/// interpretation can form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StaffId(pub usize);

/// Shape tag of a candidate symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Shape {
    Beam,
    Ledger,
    MultiRest,
    Serif,
}

/// Geometric descriptor: a median line plus a thickness.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Median {
    pub p1: Point2<f64>,
    pub p2: Point2<f64>,
    pub thickness: f64,
}

impl Median {
    pub fn new(p1: Point2<f64>, p2: Point2<f64>, thickness: f64) -> Self {
        Self { p1, p2, thickness }
    }

    /// Horizontal median line at ordinate `y` spanning `[x1, x2]`.
    pub fn horizontal(x1: f64, x2: f64, y: f64, thickness: f64) -> Self {
        Self::new(Point2::new(x1, y), Point2::new(x2, y), thickness)
    }

    /// Vertical median line at abscissa `x` spanning `[y1, y2]`.
    pub fn vertical(x: f64, y1: f64, y2: f64, thickness: f64) -> Self {
        Self::new(Point2::new(x, y1), Point2::new(x, y2), thickness)
    }

    pub fn length(&self) -> f64 {
        (self.p2 - self.p1).norm()
    }

    pub fn center(&self) -> Point2<f64> {
        nalgebra::center(&self.p1, &self.p2)
    }

    /// Ordinate of the median line at abscissa `x` (extrapolates beyond the
    /// endpoints; callers gate on the abscissa range themselves).
    pub fn y_at(&self, x: f64) -> f64 {
        let dx = self.p2.x - self.p1.x;
        if dx.abs() < f64::EPSILON {
            return self.center().y;
        }
        self.p1.y + (x - self.p1.x) * (self.p2.y - self.p1.y) / dx
    }

    pub fn x_min(&self) -> f64 {
        self.p1.x.min(self.p2.x)
    }

    pub fn x_max(&self) -> f64 {
        self.p1.x.max(self.p2.x)
    }

    /// Length of the abscissa overlap with another median, negative when the
    /// projections are disjoint.
    pub fn x_overlap(&self, other: &Median) -> f64 {
        self.x_max().min(other.x_max()) - self.x_min().max(other.x_min())
    }
}

/// A candidate symbolic element.
///
/// The grade lives in `[0, 1]` and is monotonically non-increasing: the only
/// mutator is [`Interpretation::decrease_grade`]. Re-deriving a grade from
/// fresh evidence means creating a new interpretation.
#[derive(Clone, Debug)]
pub struct Interpretation {
    id: InterId,
    shape: Shape,
    grade: f64,
    median: Median,
    staff: Option<StaffId>,
    line_index: Option<i32>,
}

impl Interpretation {
    pub fn new(shape: Shape, median: Median, grade: f64) -> Self {
        Self {
            id: InterId(0),
            shape,
            grade: grade.clamp(0.0, 1.0),
            median,
            staff: None,
            line_index: None,
        }
    }

    /// Attaches the weak staff back-reference.
    pub fn on_staff(mut self, staff: StaffId) -> Self {
        self.staff = Some(staff);
        self
    }

    /// Records the staff-relative line offset (ledgers: +/-1 is the first
    /// ledger below/above the staff).
    pub fn at_line(mut self, index: i32) -> Self {
        self.line_index = Some(index);
        self
    }

    pub fn id(&self) -> InterId {
        self.id
    }

    pub(super) fn assign_id(&mut self, id: InterId) {
        self.id = id;
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn grade(&self) -> f64 {
        self.grade
    }

    /// Lowers the grade; a value above the current grade is ignored.
    pub fn decrease_grade(&mut self, grade: f64) {
        self.grade = self.grade.min(grade.clamp(0.0, 1.0));
    }

    pub fn median(&self) -> &Median {
        &self.median
    }

    pub fn staff(&self) -> Option<StaffId> {
        self.staff
    }

    pub fn line_index(&self) -> Option<i32> {
        self.line_index
    }
}
