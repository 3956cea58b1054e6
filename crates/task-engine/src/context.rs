//! Design context: the mutable state threaded through one task.

use std::collections::HashMap;

use cad_authority::{
    AuthorityError, AuthorityIntrospect, BodyId, CadAuthority, ComponentId, FeatureId, SketchId,
};

use crate::error::OperationError;

/// Name that always refers to the top-level component.
pub const ROOT_ALIAS: &str = "root";

/// What the engine has built inside one component, in creation order.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentRecord {
    pub id: ComponentId,
    pub name: String,
    pub sketches: Vec<SketchId>,
    pub features: Vec<FeatureId>,
    /// Mirrors the authority after every operation.
    pub bodies: Vec<BodyId>,
}

impl ComponentRecord {
    fn new(id: ComponentId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            sketches: Vec::new(),
            features: Vec::new(),
            bodies: Vec::new(),
        }
    }
}

/// Components of the open design plus which one is active.
///
/// The root record is always first. Exactly one component is active; new
/// sketches, features and body lookups happen in it.
#[derive(Debug, Clone)]
pub struct DesignContext {
    components: Vec<ComponentRecord>,
    names: HashMap<String, usize>,
    active: usize,
}

impl DesignContext {
    /// Context for a document whose root component is already open.
    pub fn new(root_name: &str) -> Self {
        Self {
            components: vec![ComponentRecord::new(ComponentId::ROOT, root_name)],
            names: HashMap::new(),
            active: 0,
        }
    }

    /// Open a fresh document and start a context for it.
    pub fn open<K: CadAuthority + ?Sized>(
        kb: &mut K,
        root_name: &str,
    ) -> Result<Self, AuthorityError> {
        kb.new_document(root_name)?;
        Ok(Self::new(root_name))
    }

    pub fn root(&self) -> &ComponentRecord {
        &self.components[0]
    }

    pub fn active(&self) -> &ComponentRecord {
        &self.components[self.active]
    }

    pub fn active_id(&self) -> ComponentId {
        self.active().id
    }

    /// Every component, root first.
    pub fn components(&self) -> &[ComponentRecord] {
        &self.components
    }

    pub fn component_named(&self, name: &str) -> Option<&ComponentRecord> {
        self.index_of(name).map(|i| &self.components[i])
    }

    /// Component id for a name. `"root"` is the top-level component.
    pub fn resolve(&self, name: &str) -> Result<ComponentId, OperationError> {
        self.component_named(name)
            .map(|c| c.id)
            .ok_or_else(|| OperationError::UnknownComponent {
                name: name.to_string(),
            })
    }

    /// Create a component under the root and make it active.
    pub fn create_component<K: CadAuthority + ?Sized>(
        &mut self,
        kb: &mut K,
        name: &str,
    ) -> Result<ComponentId, OperationError> {
        let reject = |reason: &str| OperationError::ComponentName {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        if name.trim().is_empty() {
            return Err(reject("name is empty"));
        }
        if name == ROOT_ALIAS {
            return Err(reject("the name is reserved for the top-level component"));
        }
        if self.names.contains_key(name) {
            return Err(reject("a component with this name already exists"));
        }

        let id = kb.add_component(name)?;
        self.components.push(ComponentRecord::new(id, name));
        let index = self.components.len() - 1;
        self.names.insert(name.to_string(), index);
        self.active = index;
        Ok(id)
    }

    /// Switch the active component by name.
    pub fn activate(&mut self, name: &str) -> Result<ComponentId, OperationError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| OperationError::UnknownComponent {
                name: name.to_string(),
            })?;
        self.active = index;
        Ok(self.components[index].id)
    }

    pub fn record_sketch(&mut self, sketch: SketchId) {
        self.components[self.active].sketches.push(sketch);
    }

    pub fn record_feature(&mut self, feature: FeatureId) {
        self.components[self.active].features.push(feature);
    }

    pub fn last_sketch(&self) -> Result<SketchId, OperationError> {
        self.active()
            .sketches
            .last()
            .copied()
            .ok_or_else(|| self.missing("sketch"))
    }

    pub fn last_feature(&self) -> Result<FeatureId, OperationError> {
        self.active()
            .features
            .last()
            .copied()
            .ok_or_else(|| self.missing("feature"))
    }

    pub fn last_body(&self) -> Result<BodyId, OperationError> {
        self.active()
            .bodies
            .last()
            .copied()
            .ok_or_else(|| self.missing("body"))
    }

    /// Sketch of the active component by 0-based position.
    pub fn sketch_at(&self, index: i64) -> Result<SketchId, OperationError> {
        checked(&self.active().sketches, index, "sketch")
    }

    /// Body of the active component by 0-based position.
    pub fn body_at(&self, index: i64) -> Result<BodyId, OperationError> {
        checked(&self.active().bodies, index, "body")
    }

    /// Refresh every component's body list from the authority.
    pub fn sync_bodies(&mut self, kb: &dyn AuthorityIntrospect) {
        for record in &mut self.components {
            record.bodies = kb.bodies(record.id);
        }
    }

    /// Bodies of every component except the root.
    pub fn occurrence_bodies(&self) -> Vec<BodyId> {
        self.components[1..]
            .iter()
            .flat_map(|c| c.bodies.iter().copied())
            .collect()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        if name == ROOT_ALIAS {
            Some(0)
        } else {
            self.names.get(name).copied()
        }
    }

    fn missing(&self, what: &'static str) -> OperationError {
        OperationError::Missing {
            what,
            component: self.active().name.clone(),
        }
    }
}

fn checked<T: Copy>(items: &[T], index: i64, what: &'static str) -> Result<T, OperationError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i).copied())
        .ok_or(OperationError::OutOfRange {
            what,
            index,
            count: items.len(),
        })
}
