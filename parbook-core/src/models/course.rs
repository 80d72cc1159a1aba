use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Number of holes on a regulation course.
pub const HOLE_COUNT: usize = 18;

/// A single hole on a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hole {
    pub hole_number: u8,
    pub par: u8,
}

/// A golf course with exactly 18 holes, numbered 1 through 18.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    pub holes: Vec<Hole>,
}

impl Course {
    /// Creates a course from 18 par values (index 0 = hole 1).
    ///
    /// Each par must be 3, 4, or 5.
    pub fn new(name: impl Into<String>, pars: [u8; HOLE_COUNT]) -> Result<Self, ValidationError> {
        let mut holes = Vec::with_capacity(HOLE_COUNT);
        for (i, &par) in pars.iter().enumerate() {
            let hole_number = (i + 1) as u8;
            if !(3..=5).contains(&par) {
                return Err(ValidationError::InvalidPar {
                    hole: hole_number,
                    par,
                });
            }
            holes.push(Hole { hole_number, par });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            holes,
        })
    }

    /// Builds a course from an unordered list of holes.
    ///
    /// Validates the 18-unique-holes invariant, so rows loaded from
    /// storage go through the same checks as constructed courses.
    pub fn from_holes(
        id: Uuid,
        name: impl Into<String>,
        mut holes: Vec<Hole>,
    ) -> Result<Self, ValidationError> {
        if holes.len() != HOLE_COUNT {
            return Err(ValidationError::WrongHoleCount(holes.len()));
        }
        holes.sort_by_key(|h| h.hole_number);
        for (i, hole) in holes.iter().enumerate() {
            if hole.hole_number != (i + 1) as u8 {
                return Err(ValidationError::HoleOutOfRange(hole.hole_number));
            }
            if !(3..=5).contains(&hole.par) {
                return Err(ValidationError::InvalidPar {
                    hole: hole.hole_number,
                    par: hole.par,
                });
            }
        }
        Ok(Self {
            id,
            name: name.into(),
            holes,
        })
    }

    /// Returns the par for a hole number, or `None` when out of range.
    pub fn par_for(&self, hole_number: u8) -> Option<u8> {
        self.holes
            .iter()
            .find(|h| h.hole_number == hole_number)
            .map(|h| h.par)
    }

    /// Total par for the front nine (holes 1-9).
    pub fn out_par(&self) -> u32 {
        self.holes
            .iter()
            .filter(|h| h.hole_number <= 9)
            .map(|h| h.par as u32)
            .sum()
    }

    /// Total par for the back nine (holes 10-18).
    pub fn in_par(&self) -> u32 {
        self.holes
            .iter()
            .filter(|h| h.hole_number > 9)
            .map(|h| h.par as u32)
            .sum()
    }

    pub fn total_par(&self) -> u32 {
        self.out_par() + self.in_par()
    }
}

/// Par layout used by the demo seed: short holes at 3/6/12/15, long
/// holes at 5/9/13/18, middle holes everywhere else.
pub fn demo_pars() -> [u8; HOLE_COUNT] {
    let mut pars = [4u8; HOLE_COUNT];
    for n in [3, 6, 12, 15] {
        pars[n - 1] = 3;
    }
    for n in [5, 9, 13, 18] {
        pars[n - 1] = 5;
    }
    pars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_new_valid() {
        let course = Course::new("Test Golf Club", demo_pars()).unwrap();
        assert_eq!(course.holes.len(), 18);
        assert_eq!(course.par_for(3), Some(3));
        assert_eq!(course.par_for(9), Some(5));
        assert_eq!(course.par_for(1), Some(4));
        assert_eq!(course.par_for(19), None);
    }

    #[test]
    fn test_course_rejects_invalid_par() {
        let mut pars = demo_pars();
        pars[7] = 6;
        let err = Course::new("Bad Course", pars).unwrap_err();
        assert_eq!(err, ValidationError::InvalidPar { hole: 8, par: 6 });
    }

    #[test]
    fn test_from_holes_requires_all_eighteen() {
        let holes: Vec<Hole> = (1..=17)
            .map(|n| Hole {
                hole_number: n,
                par: 4,
            })
            .collect();
        let err = Course::from_holes(Uuid::new_v4(), "Short Course", holes).unwrap_err();
        assert_eq!(err, ValidationError::WrongHoleCount(17));
    }

    #[test]
    fn test_from_holes_rejects_duplicates() {
        let mut holes: Vec<Hole> = (1..=18)
            .map(|n| Hole {
                hole_number: n,
                par: 4,
            })
            .collect();
        holes[17].hole_number = 1; // duplicate hole 1, missing hole 18
        let result = Course::from_holes(Uuid::new_v4(), "Dup Course", holes);
        assert!(result.is_err());
    }

    #[test]
    fn test_out_in_par_split() {
        let course = Course::new("Test Golf Club", demo_pars()).unwrap();
        assert_eq!(course.out_par(), 36);
        assert_eq!(course.in_par(), 36);
        assert_eq!(course.total_par(), 72);
    }
}
