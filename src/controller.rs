use crate::data::{LoadState, MapData, LOAD_ERROR_MESSAGE};
use crate::projection::Projection;
use crate::scene::{build_scene, tooltip_content, CountyShape, Scene};
use crate::spatial::CountyIndex;
use crate::topology::TopologyError;
use crate::types::{Pointer, TooltipState};
use std::sync::Arc;
use tracing::{info, warn};

pub const TOOLTIP_OFFSET_X: f64 = 10.0;
pub const TOOLTIP_OFFSET_Y: f64 = -28.0;

/// What the page should show right now.
#[derive(Debug, Clone)]
pub enum View {
    Loading,
    Failed(String),
    Ready(Arc<Scene>),
}

pub struct MapController {
    projection: Box<dyn Projection>,
    data: Option<Arc<MapData>>,
    scene: Option<Arc<Scene>>,
    spatial: Option<CountyIndex>,
    tooltip: TooltipState,
    hovered: Option<u32>,
    rebuilds: usize,
}

impl MapController {
    pub fn new(projection: Box<dyn Projection>) -> Self {
        Self {
            projection,
            data: None,
            scene: None,
            spatial: None,
            tooltip: TooltipState::default(),
            hovered: None,
            rebuilds: 0,
        }
    }

    /// Returns whether a rebuild happened. The same `Arc` twice is a no-op,
    /// including when the first attempt failed.
    pub fn set_data(&mut self, data: Arc<MapData>) -> Result<bool, TopologyError> {
        if self.data.as_ref().is_some_and(|current| Arc::ptr_eq(current, &data)) {
            return Ok(false);
        }
        self.data = Some(Arc::clone(&data));
        self.scene = None;
        self.spatial = None;

        let scene = build_scene(&data, self.projection.as_ref())?;
        self.spatial = Some(CountyIndex::build(&scene.counties));
        info!(counties = scene.counties.len(), "map scene rebuilt");
        self.scene = Some(Arc::new(scene));
        self.rebuilds += 1;
        Ok(true)
    }

    pub fn sync(&mut self, state: &LoadState) -> View {
        match state {
            LoadState::Loading => View::Loading,
            LoadState::Failed(message) => View::Failed(message.clone()),
            LoadState::Ready(data) => {
                if let Err(e) = self.set_data(Arc::clone(data)) {
                    warn!(error = %e, "topology could not be decoded");
                }
                match &self.scene {
                    Some(scene) => View::Ready(Arc::clone(scene)),
                    None => View::Failed(LOAD_ERROR_MESSAGE.to_string()),
                }
            }
        }
    }

    pub fn scene(&self) -> Option<Arc<Scene>> {
        self.scene.clone()
    }

    pub fn tooltip(&self) -> &TooltipState {
        &self.tooltip
    }

    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Shows the tooltip for a county with education data. Counties without
    /// a record leave the tooltip as it was.
    pub fn hover_in(&mut self, fips: u32, pointer: Pointer) -> bool {
        let Some(entry) = self.scene.as_ref().and_then(|s| s.index.get(fips)) else {
            return false;
        };
        self.tooltip = TooltipState {
            visible: true,
            content: tooltip_content(entry),
            x: pointer.x,
            y: pointer.y,
        };
        self.hovered = Some(fips);
        true
    }

    /// Hides the tooltip; content and position are kept. When the county
    /// being left is named, the tooltip is hidden only if it still belongs
    /// to that county, so a late mouseout cannot hide a newer tooltip.
    pub fn hover_out(&mut self, left: Option<u32>) -> bool {
        if left.is_some_and(|fips| self.hovered != Some(fips)) {
            return false;
        }
        self.tooltip.visible = false;
        true
    }

    pub fn hovered(&self) -> Option<u32> {
        self.hovered
    }

    pub fn county_at(&self, x: f64, y: f64) -> Option<&CountyShape> {
        let scene = self.scene.as_ref()?;
        let slot = self.spatial.as_ref()?.locate(&scene.counties, x, y)?;
        scene.counties.get(slot)
    }
}

/// Where the tooltip overlay is drawn relative to the document.
pub fn tooltip_anchor(tooltip: &TooltipState) -> (f64, f64) {
    (tooltip.x + TOOLTIP_OFFSET_X, tooltip.y + TOOLTIP_OFFSET_Y)
}
