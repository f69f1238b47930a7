use crate::scene::CountyShape;
use geo::algorithm::contains::Contains;
use geo::bounding_rect::BoundingRect;
use geo::Point;
use rstar::{RTree, RTreeObject, AABB};

// Wrapper so the tree only stores envelopes; outlines stay in the scene.
pub struct CountyEnvelope {
    slot: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for CountyEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Screen-space lookup from a pointer position to the county under it.
pub struct CountyIndex {
    tree: RTree<CountyEnvelope>,
}

impl CountyIndex {
    pub fn build(counties: &[CountyShape]) -> Self {
        let items: Vec<CountyEnvelope> = counties
            .iter()
            .enumerate()
            .filter_map(|(slot, county)| {
                let rect = county.outline.bounding_rect()?;
                Some(CountyEnvelope {
                    slot,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Position in `counties` of the shape containing the point.
    pub fn locate(&self, counties: &[CountyShape], x: f64, y: f64) -> Option<usize> {
        let point = Point::new(x, y);
        let envelope = AABB::from_point([x, y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|candidate| candidate.slot)
            .find(|&slot| counties.get(slot).is_some_and(|c| c.outline.contains(&point)))
    }
}
