//! Scene data for one live document.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    Asset, AssetId, Camera, CameraConstraints, CanvasError, CanvasResult, ContainerId, Element,
    ElementId, OrderIndex,
};

/// All records of a document plus its viewport state.
///
/// `Scene` is plain data and enforces only referential integrity; reactive
/// behavior lives in [`crate::Editor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// All elements in the scene, indexed by ID.
    elements: HashMap<ElementId, Element>,
    /// All assets in the scene, indexed by ID.
    assets: HashMap<AssetId, Asset>,
    /// Container currently shown.
    current_container: ContainerId,
    /// Viewport width in pixels.
    pub viewport_width: f32,
    /// Viewport height in pixels.
    pub viewport_height: f32,
    /// Viewing camera.
    camera: Camera,
    /// Active camera constraint, if any.
    constraints: Option<CameraConstraints>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl Scene {
    /// Create a new empty scene with the given viewport size.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            elements: HashMap::new(),
            assets: HashMap::new(),
            current_container: ContainerId::new(),
            viewport_width: width,
            viewport_height: height,
            camera: Camera::default(),
            constraints: None,
        }
    }

    /// The container currently shown.
    #[must_use]
    pub fn current_container(&self) -> ContainerId {
        self.current_container
    }

    /// Switch the container currently shown.
    pub fn set_current_container(&mut self, container: ContainerId) {
        self.current_container = container;
    }

    /// Add an element to the scene.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::DuplicateId`] if the ID is taken and
    /// [`CanvasError::AssetNotFound`] if the element references a missing asset.
    pub fn add_element(&mut self, element: Element) -> CanvasResult<ElementId> {
        self.check_insertable(&element)?;
        let id = element.id;
        self.elements.insert(id, element);
        Ok(id)
    }

    /// Validate that `element` could be inserted as-is.
    ///
    /// # Errors
    ///
    /// See [`Scene::add_element`].
    pub fn check_insertable(&self, element: &Element) -> CanvasResult<()> {
        if self.elements.contains_key(&element.id) {
            return Err(CanvasError::DuplicateId(element.id.to_string()));
        }
        if let Some(asset_id) = element.kind.asset_id() {
            if !self.assets.contains_key(&asset_id) {
                return Err(CanvasError::AssetNotFound(asset_id.to_string()));
            }
        }
        Ok(())
    }

    /// Replace an existing element, returning the previous record.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not found.
    pub fn replace_element(&mut self, element: Element) -> CanvasResult<Element> {
        let slot = self
            .elements
            .get_mut(&element.id)
            .ok_or_else(|| CanvasError::ElementNotFound(element.id.to_string()))?;
        Ok(std::mem::replace(slot, element))
    }

    /// Remove an element from the scene.
    ///
    /// # Errors
    ///
    /// Returns an error if the element is not found.
    pub fn remove_element(&mut self, id: &ElementId) -> CanvasResult<Element> {
        self.elements
            .remove(id)
            .ok_or_else(|| CanvasError::ElementNotFound(id.to_string()))
    }

    /// Get an element by ID.
    #[must_use]
    pub fn get_element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Get all elements in the scene.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Add an asset to the scene.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::DuplicateId`] if the ID is taken.
    pub fn add_asset(&mut self, asset: Asset) -> CanvasResult<AssetId> {
        if self.assets.contains_key(&asset.id) {
            return Err(CanvasError::DuplicateId(asset.id.to_string()));
        }
        let id = asset.id;
        self.assets.insert(id, asset);
        Ok(id)
    }

    /// Whether an asset with this ID exists.
    #[must_use]
    pub fn has_asset(&self, id: AssetId) -> bool {
        self.assets.contains_key(&id)
    }

    /// Get an asset by ID.
    #[must_use]
    pub fn get_asset(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(&id)
    }

    /// Remove an asset from the scene.
    ///
    /// # Errors
    ///
    /// Returns an error if the asset is not found.
    pub fn remove_asset(&mut self, id: &AssetId) -> CanvasResult<Asset> {
        self.assets
            .remove(id)
            .ok_or_else(|| CanvasError::AssetNotFound(id.to_string()))
    }

    /// Get all assets in the scene.
    pub fn assets(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    /// Children of `container`, bottom-most first.
    #[must_use]
    pub fn children_in_paint_order(&self, container: ContainerId) -> Vec<&Element> {
        let mut children: Vec<_> = self
            .elements
            .values()
            .filter(|e| e.parent == container)
            .collect();
        children.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.id.cmp(&b.id)));
        children
    }

    /// Index of the top-most child of `container`.
    #[must_use]
    pub fn top_index(&self, container: ContainerId) -> Option<OrderIndex> {
        self.elements
            .values()
            .filter(|e| e.parent == container)
            .map(|e| &e.index)
            .max()
            .cloned()
    }

    /// Set the viewport dimensions.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.viewport_width = width;
        self.viewport_height = height;
        self.camera = self.constrained(self.camera);
    }

    /// Current camera.
    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    /// Move the camera, honoring the active constraint.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = self.constrained(camera);
    }

    /// Active camera constraint.
    #[must_use]
    pub fn camera_constraints(&self) -> Option<&CameraConstraints> {
        self.constraints.as_ref()
    }

    /// Install or remove the camera constraint.
    pub fn set_camera_constraints(&mut self, constraints: Option<CameraConstraints>) {
        self.constraints = constraints;
    }

    /// Reset the camera to the constraint's initial framing, or to the
    /// identity camera when unconstrained.
    pub fn reset_camera(&mut self) {
        self.camera = match &self.constraints {
            Some(c) => c.initial_camera((self.viewport_width, self.viewport_height)),
            None => Camera::default(),
        };
    }

    fn constrained(&self, camera: Camera) -> Camera {
        match &self.constraints {
            Some(c) => c.clamp(camera, (self.viewport_width, self.viewport_height)),
            None => camera,
        }
    }

    /// Get the number of elements in the scene.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Get the number of assets in the scene.
    #[must_use]
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Check if the scene has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Serialize the scene to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CanvasResult<String> {
        serde_json::to_string(self).map_err(CanvasError::Serialization)
    }

    /// Deserialize a scene from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        serde_json::from_str(json).map_err(CanvasError::Serialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ElementKind, Rect};

    fn text(scene: &Scene, content: &str) -> Element {
        Element::new(
            ElementKind::Text {
                content: content.to_string(),
                font_size: 16.0,
                color: "#000000".to_string(),
            },
            scene.current_container(),
        )
    }

    #[test]
    fn test_scene_add_remove() {
        let mut scene = Scene::new(800.0, 600.0);
        assert!(scene.is_empty());

        let id = scene.add_element(text(&scene, "Hello")).expect("add");
        assert_eq!(scene.element_count(), 1);
        assert!(scene.get_element(id).is_some());

        scene.remove_element(&id).expect("should remove");
        assert!(scene.is_empty());
    }

    #[test]
    fn test_duplicate_element_rejected() {
        let mut scene = Scene::new(800.0, 600.0);
        let element = text(&scene, "once");
        scene.add_element(element.clone()).expect("add");
        assert!(matches!(
            scene.add_element(element),
            Err(CanvasError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_missing_asset_rejected() {
        let mut scene = Scene::new(800.0, 600.0);
        let image = Element::new(
            ElementKind::Image {
                asset_id: AssetId::new(),
            },
            scene.current_container(),
        );
        assert!(matches!(
            scene.add_element(image),
            Err(CanvasError::AssetNotFound(_))
        ));
    }

    #[test]
    fn test_paint_order_follows_index() {
        let mut scene = Scene::new(800.0, 600.0);
        let top = text(&scene, "top").with_index(OrderIndex::parse("b").expect("key"));
        let bottom = text(&scene, "bottom").with_index(OrderIndex::parse("a").expect("key"));
        let other_page = Element::new(
            ElementKind::Geo {
                geo: "rectangle".to_string(),
                color: "#ff0000".to_string(),
            },
            ContainerId::new(),
        );
        let (top_id, bottom_id) = (top.id, bottom.id);
        scene.add_element(top).expect("add");
        scene.add_element(bottom).expect("add");
        scene.add_element(other_page).expect("add");

        let order: Vec<_> = scene
            .children_in_paint_order(scene.current_container())
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(order, vec![bottom_id, top_id]);
        assert_eq!(
            scene.top_index(scene.current_container()).map(String::from),
            Some("b".to_string())
        );
    }

    #[test]
    fn test_constraint_applies_on_set_camera() {
        let mut scene = Scene::new(1200.0, 800.0);
        scene.set_camera_constraints(Some(CameraConstraints::contain(
            Rect::new(0.0, 0.0, 600.0, 3000.0),
            164.0,
            64.0,
        )));
        scene.set_camera(Camera {
            pan_x: 0.0,
            pan_y: 999.0,
            zoom: 1.0,
        });
        assert!((scene.camera().pan_y - 64.0).abs() < 1e-4);
    }

    #[test]
    fn test_json_round_trip() {
        let mut scene = Scene::new(1024.0, 768.0);
        scene.add_element(text(&scene, "persist")).expect("add");
        let json = scene.to_json().expect("to json");
        let restored = Scene::from_json(&json).expect("from json");
        assert_eq!(restored.element_count(), 1);
        assert_eq!(restored.current_container(), scene.current_container());
    }
}
