use crate::record::Mark;

/// Minimum mark counted as a pass.
pub const PASS_MARK: Mark = 33;

/// One labelled mark range of the grade rubric.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeBand {
    /// Lower bound, inclusive.
    pub min: f64,
    /// Upper bound, inclusive.
    pub max: f64,
    /// Points awarded per mark in this band when computing the API.
    pub points: i32,
    /// Label used in distribution reports (e.g. `"90-94.99"`).
    pub label: String,
    /// Column heading used in the cross-subject summary (e.g. `">90"`).
    pub column: String,
    /// Only a literal zero falls in this band, whatever `min..=max` says.
    pub exact_zero: bool,
}

impl GradeBand {
    fn new(min: f64, max: f64, points: i32, label: &str, column: &str) -> Self {
        Self {
            min,
            max,
            points,
            label: label.to_string(),
            column: column.to_string(),
            exact_zero: false,
        }
    }

    /// Whether `mark` falls in this band.
    pub fn claims(&self, mark: Mark) -> bool {
        if self.exact_zero {
            return mark == 0;
        }
        let m = f64::from(mark);
        m >= self.min && m <= self.max
    }
}

/// Ordered set of grade bands covering `[0, 100]`.
///
/// Bands are evaluated in order and the first claiming band wins. With the
/// standard rubric every integer mark in range is claimed by exactly one band.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeRubric {
    bands: Vec<GradeBand>,
    pass_mark: Mark,
}

impl Default for GradeRubric {
    fn default() -> Self {
        Self::standard()
    }
}

impl GradeRubric {
    /// The board rubric: 10 points above 95 down to -3 for an outright fail.
    ///
    /// Marks from 1 to 32 are "Compartment"; only a literal 0 is "Fail".
    pub fn standard() -> Self {
        let mut fail = GradeBand::new(0.0, 0.99, -3, "Fail", "Fail");
        fail.exact_zero = true;
        Self {
            bands: vec![
                GradeBand::new(95.0, 100.0, 10, ">95", ">95"),
                GradeBand::new(90.0, 94.99, 8, "90-94.99", ">90"),
                GradeBand::new(80.0, 89.99, 6, "80-89.9", ">80"),
                GradeBand::new(70.0, 79.99, 4, "70-79.9", ">70"),
                GradeBand::new(60.0, 69.99, 2, "60-69.9", ">60"),
                GradeBand::new(50.0, 59.99, 0, "50-59.99", ">50"),
                GradeBand::new(33.0, 49.99, -1, "33-49.99", ">33"),
                GradeBand::new(1.0, 32.99, -2, "Compartment", "Compartment"),
                fail,
            ],
            pass_mark: PASS_MARK,
        }
    }

    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    pub fn pass_mark(&self) -> Mark {
        self.pass_mark
    }

    /// The band claiming `mark`, if any.
    pub fn band_for(&self, mark: Mark) -> Option<&GradeBand> {
        self.bands.iter().find(|b| b.claims(mark))
    }

    /// Points awarded for `mark`; marks outside every band earn nothing.
    pub fn points_for(&self, mark: Mark) -> i32 {
        self.band_for(mark).map(|b| b.points).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_mark_claimed_exactly_once() {
        let rubric = GradeRubric::standard();
        for mark in 0..=100 {
            let claiming = rubric.bands().iter().filter(|b| b.claims(mark)).count();
            assert_eq!(claiming, 1, "mark {mark} claimed by {claiming} bands");
        }
    }

    #[test]
    fn test_fail_is_exactly_zero() {
        let rubric = GradeRubric::standard();
        assert_eq!(rubric.band_for(0).unwrap().label, "Fail");
        assert_eq!(rubric.band_for(1).unwrap().label, "Compartment");
        assert_eq!(rubric.band_for(32).unwrap().label, "Compartment");
        assert_eq!(rubric.band_for(33).unwrap().label, "33-49.99");
    }

    #[test]
    fn test_band_edges() {
        let rubric = GradeRubric::standard();
        assert_eq!(rubric.band_for(100).unwrap().label, ">95");
        assert_eq!(rubric.band_for(95).unwrap().label, ">95");
        assert_eq!(rubric.band_for(94).unwrap().label, "90-94.99");
        assert_eq!(rubric.band_for(90).unwrap().label, "90-94.99");
        assert_eq!(rubric.band_for(89).unwrap().label, "80-89.9");
        assert_eq!(rubric.band_for(50).unwrap().label, "50-59.99");
        assert_eq!(rubric.band_for(49).unwrap().label, "33-49.99");
    }

    #[test]
    fn test_out_of_range_mark_unclaimed() {
        let rubric = GradeRubric::standard();
        assert!(rubric.band_for(101).is_none());
        assert_eq!(rubric.points_for(101), 0);
    }

    #[test]
    fn test_points() {
        let rubric = GradeRubric::standard();
        assert_eq!(rubric.points_for(97), 10);
        assert_eq!(rubric.points_for(91), 8);
        assert_eq!(rubric.points_for(55), 0);
        assert_eq!(rubric.points_for(12), -2);
        assert_eq!(rubric.points_for(0), -3);
        assert_eq!(rubric.pass_mark(), 33);
    }
}
