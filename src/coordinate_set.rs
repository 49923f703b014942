use nalgebra::{Isometry2, Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::SpatialError;

/// Category of an entity in a facility location instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Facility,
    Customer,
}

/// Which entities take part in a classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stratum {
    #[default]
    All,
    Facilities,
    Customers,
}

impl Stratum {
    fn admits(&self, kind: EntityKind) -> bool {
        match self {
            Stratum::All => true,
            Stratum::Facilities => kind == EntityKind::Facility,
            Stratum::Customers => kind == EntityKind::Customer,
        }
    }
}

/// Ordered 2D coordinates, one per entity, index-aligned with the distance
/// matrix they were embedded from (facilities first, then customers).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateSet {
    points: Vec<Point2<f64>>,
    kinds: Vec<EntityKind>,
}

impl CoordinateSet {
    /// # Errors
    ///
    /// Returns `SpatialError::InvalidInput` if `points` and `kinds` differ in
    /// length or any coordinate is non-finite.
    pub fn new(points: Vec<Point2<f64>>, kinds: Vec<EntityKind>) -> Result<Self, SpatialError> {
        if points.len() != kinds.len() {
            return Err(SpatialError::invalid_input(format!(
                "{} points but {} entity tags",
                points.len(),
                kinds.len()
            )));
        }
        if let Some(i) = points.iter().position(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(SpatialError::invalid_input(format!("point {} has a non-finite coordinate", i)));
        }
        Ok(Self { points, kinds })
    }

    /// Builds a set from `[x, y]` pairs where the first `n_facilities` entries
    /// are facilities and the rest customers.
    pub fn from_pairs(pairs: &[[f64; 2]], n_facilities: usize) -> Result<Self, SpatialError> {
        if n_facilities > pairs.len() {
            return Err(SpatialError::invalid_input(format!(
                "{} facilities requested but only {} points given",
                n_facilities,
                pairs.len()
            )));
        }
        let points = pairs.iter().map(|&[x, y]| Point2::new(x, y)).collect();
        let kinds = (0..pairs.len())
            .map(|i| if i < n_facilities { EntityKind::Facility } else { EntityKind::Customer })
            .collect();
        Self::new(points, kinds)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn kinds(&self) -> &[EntityKind] {
        &self.kinds
    }

    pub fn to_pairs(&self) -> Vec<[f64; 2]> {
        self.points.iter().map(|p| [p.x, p.y]).collect()
    }

    /// The entities admitted by `stratum`, order preserved.
    pub fn stratum(&self, stratum: Stratum) -> CoordinateSet {
        let (points, kinds) = self
            .points
            .iter()
            .zip(&self.kinds)
            .filter(|(_, kind)| stratum.admits(**kind))
            .map(|(p, k)| (*p, *k))
            .unzip();
        CoordinateSet { points, kinds }
    }

    /// Applies an optional reflection across the x axis, then a rotation by
    /// `angle` radians and a translation. Pairwise distances are preserved.
    pub fn rigid_transform(&self, angle: f64, translation: Vector2<f64>, reflect: bool) -> CoordinateSet {
        let isometry = Isometry2::new(translation, angle);
        let points = self
            .points
            .iter()
            .map(|p| {
                let p = if reflect { Point2::new(p.x, -p.y) } else { *p };
                isometry * p
            })
            .collect();
        CoordinateSet {
            points,
            kinds: self.kinds.clone(),
        }
    }

    /// Translates the set so its centroid is at the origin.
    pub(crate) fn centered(mut self) -> CoordinateSet {
        if self.points.is_empty() {
            return self;
        }
        let centroid = self.points.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / self.points.len() as f64;
        for p in self.points.iter_mut() {
            p.coords -= centroid;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::distance;

    fn sample() -> CoordinateSet {
        CoordinateSet::from_pairs(&[[0.0, 0.0], [1.0, 0.0], [0.0, 2.0], [3.0, 1.0]], 2).unwrap()
    }

    #[test]
    fn test_from_pairs_tags() {
        let set = sample();
        assert_eq!(set.len(), 4);
        assert_eq!(set.kinds()[1], EntityKind::Facility);
        assert_eq!(set.kinds()[2], EntityKind::Customer);
        assert_eq!(set.to_pairs()[3], [3.0, 1.0]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(CoordinateSet::from_pairs(&[[0.0, 0.0]], 2).is_err());
        assert!(CoordinateSet::from_pairs(&[[f64::NAN, 0.0]], 0).is_err());
        assert!(CoordinateSet::new(vec![Point2::origin()], vec![]).is_err());
    }

    #[test]
    fn test_stratum() {
        let set = sample();
        let facilities = set.stratum(Stratum::Facilities);
        assert_eq!(facilities.to_pairs(), vec![[0.0, 0.0], [1.0, 0.0]]);
        let customers = set.stratum(Stratum::Customers);
        assert_eq!(customers.to_pairs(), vec![[0.0, 2.0], [3.0, 1.0]]);
        assert_eq!(set.stratum(Stratum::All), set);
    }

    #[test]
    fn test_rigid_transform_preserves_distances() {
        let set = sample();
        let moved = set.rigid_transform(0.7, Vector2::new(5.0, -3.0), true);
        for i in 0..set.len() {
            for j in 0..set.len() {
                let before = distance(&set.points()[i], &set.points()[j]);
                let after = distance(&moved.points()[i], &moved.points()[j]);
                assert!((before - after).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_centered() {
        let set = sample().centered();
        let sum = set.points().iter().fold(Vector2::zeros(), |acc, p| acc + p.coords);
        assert!(sum.norm() < 1e-12);
    }
}
