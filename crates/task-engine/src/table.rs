//! Handler tables and the behavior definitions they are compiled from.
//!
//! A handler table maps the operation `type` names found in task files to
//! the closed set of built-in handlers, maps geometry names to synthesizer
//! families, and carries the tuning constants handlers read. Tables are
//! produced by compiling a [`BehaviorDefinition`], the JSON document the
//! live loader watches.

use std::collections::BTreeMap;

use profile_synth::{GeometryFamily, SynthOptions, FULL_TURN_TOLERANCE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Format tag every behavior definition must carry.
pub const BEHAVIOR_FORMAT: &str = "cad-replay-behavior";

/// Newest behavior definition schema this build understands.
pub const BEHAVIOR_SCHEMA_VERSION: u32 = 1;

/// The built-in operation handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Sketch,
    Extrude,
    Revolve,
    Loft,
    Sweep,
    CircularPattern,
    LinearPattern,
    Shell,
    Hole,
    Fillet,
    Chamfer,
    Combine,
    CreateComponent,
    ActivateComponent,
    CreateJoint,
    TransformComponent,
}

impl OperationKind {
    pub const ALL: [OperationKind; 16] = [
        OperationKind::Sketch,
        OperationKind::Extrude,
        OperationKind::Revolve,
        OperationKind::Loft,
        OperationKind::Sweep,
        OperationKind::CircularPattern,
        OperationKind::LinearPattern,
        OperationKind::Shell,
        OperationKind::Hole,
        OperationKind::Fillet,
        OperationKind::Chamfer,
        OperationKind::Combine,
        OperationKind::CreateComponent,
        OperationKind::ActivateComponent,
        OperationKind::CreateJoint,
        OperationKind::TransformComponent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Sketch => "sketch",
            OperationKind::Extrude => "extrude",
            OperationKind::Revolve => "revolve",
            OperationKind::Loft => "loft",
            OperationKind::Sweep => "sweep",
            OperationKind::CircularPattern => "circular_pattern",
            OperationKind::LinearPattern => "linear_pattern",
            OperationKind::Shell => "shell",
            OperationKind::Hole => "hole",
            OperationKind::Fillet => "fillet",
            OperationKind::Chamfer => "chamfer",
            OperationKind::Combine => "combine",
            OperationKind::CreateComponent => "create_component",
            OperationKind::ActivateComponent => "activate_component",
            OperationKind::CreateJoint => "create_joint",
            OperationKind::TransformComponent => "transform_component",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }
}

/// Constants handlers read at run time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Depth of a `"through"` hole.
    pub through_cut_depth_mm: f64,
    /// Edges no longer than this are left out of `"all"` fillets and chamfers.
    pub min_edge_length_mm: f64,
    /// Rise above which an edge counts as vertical for `all_outer_vertical`.
    pub vertical_edge_tolerance_mm: f64,
    /// Radians within which a pattern angle counts as a full turn.
    pub full_turn_tolerance: f64,
    /// Pause after each task so the finished model can be looked at.
    pub viewing_pause_secs: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            through_cut_depth_mm: 1000.0,
            min_edge_length_mm: 0.1,
            vertical_edge_tolerance_mm: 1.0,
            full_turn_tolerance: FULL_TURN_TOLERANCE,
            viewing_pause_secs: 4.0,
        }
    }
}

impl Tuning {
    pub fn validate(&self) -> Result<(), BehaviorError> {
        let check = |ok: bool, reason: &str| {
            if ok {
                Ok(())
            } else {
                Err(BehaviorError::Tuning {
                    reason: reason.to_string(),
                })
            }
        };
        check(
            self.through_cut_depth_mm.is_finite() && self.through_cut_depth_mm > 0.0,
            "through_cut_depth_mm must be positive",
        )?;
        check(
            self.min_edge_length_mm.is_finite() && self.min_edge_length_mm >= 0.0,
            "min_edge_length_mm must not be negative",
        )?;
        check(
            self.vertical_edge_tolerance_mm.is_finite() && self.vertical_edge_tolerance_mm > 0.0,
            "vertical_edge_tolerance_mm must be positive",
        )?;
        check(
            self.full_turn_tolerance > 0.0 && self.full_turn_tolerance <= 0.1,
            "full_turn_tolerance must be in (0, 0.1]",
        )?;
        check(
            (0.0..=600.0).contains(&self.viewing_pause_secs),
            "viewing_pause_secs must be between 0 and 600",
        )
    }

    pub fn synth_options(&self) -> SynthOptions {
        SynthOptions {
            full_turn_tolerance: self.full_turn_tolerance,
        }
    }
}

/// Errors from parsing or compiling a behavior definition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BehaviorError {
    #[error("syntax error at line {line}, column {column}: {reason}")]
    Syntax {
        line: usize,
        column: usize,
        reason: String,
    },

    #[error("invalid definition at line {line}, column {column}: {reason}")]
    Schema {
        line: usize,
        column: usize,
        reason: String,
    },

    #[error("unknown format '{found}', expected '{}'", BEHAVIOR_FORMAT)]
    Format { found: String },

    #[error("schema version {found} is not supported (newest is {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("operation '{binding}' is bound to unknown handler '{handler}'")]
    UnknownHandler { binding: String, handler: String },

    #[error("geometry '{binding}' is bound to unknown family '{family}'")]
    UnknownFamily { binding: String, family: String },

    #[error("binding table '{table}' is empty")]
    EmptyBindings { table: &'static str },

    #[error("invalid tuning: {reason}")]
    Tuning { reason: String },
}

/// The patchable behavior document.
///
/// `operations` and `geometry`, when present, replace the built-in bindings
/// wholesale: an operation type missing from the map becomes unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorDefinition {
    pub format: String,
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub tuning: Tuning,
}

impl BehaviorDefinition {
    /// The definition equivalent to the built-in table.
    pub fn builtin() -> Self {
        Self {
            format: BEHAVIOR_FORMAT.to_string(),
            schema_version: BEHAVIOR_SCHEMA_VERSION,
            label: Some("builtin".to_string()),
            operations: Some(
                OperationKind::ALL
                    .iter()
                    .map(|k| (k.name().to_string(), k.name().to_string()))
                    .collect(),
            ),
            geometry: Some(
                GeometryFamily::ALL
                    .iter()
                    .map(|f| (f.name().to_string(), f.name().to_string()))
                    .collect(),
            ),
            tuning: Tuning::default(),
        }
    }

    /// Parse JSON text. Errors carry the line and column.
    pub fn parse(text: &str) -> Result<Self, BehaviorError> {
        serde_json::from_str(text).map_err(|e| {
            let (line, column, reason) = (e.line(), e.column(), e.to_string());
            match e.classify() {
                serde_json::error::Category::Data => BehaviorError::Schema {
                    line,
                    column,
                    reason,
                },
                _ => BehaviorError::Syntax {
                    line,
                    column,
                    reason,
                },
            }
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check the definition and build a table stamped with `version`.
    pub fn compile(&self, version: u32) -> Result<HandlerTable, BehaviorError> {
        if self.format != BEHAVIOR_FORMAT {
            return Err(BehaviorError::Format {
                found: self.format.clone(),
            });
        }
        if self.schema_version == 0 || self.schema_version > BEHAVIOR_SCHEMA_VERSION {
            return Err(BehaviorError::UnsupportedVersion {
                found: self.schema_version,
                supported: BEHAVIOR_SCHEMA_VERSION,
            });
        }
        self.tuning.validate()?;

        let operations = match &self.operations {
            None => builtin_operations(),
            Some(map) if map.is_empty() => {
                return Err(BehaviorError::EmptyBindings { table: "operations" })
            }
            Some(map) => map
                .iter()
                .map(|(binding, handler)| {
                    OperationKind::from_name(handler)
                        .map(|kind| (binding.clone(), kind))
                        .ok_or_else(|| BehaviorError::UnknownHandler {
                            binding: binding.clone(),
                            handler: handler.clone(),
                        })
                })
                .collect::<Result<_, _>>()?,
        };

        let geometry = match &self.geometry {
            None => builtin_geometry(),
            Some(map) if map.is_empty() => {
                return Err(BehaviorError::EmptyBindings { table: "geometry" })
            }
            Some(map) => map
                .iter()
                .map(|(binding, family)| {
                    GeometryFamily::from_name(family)
                        .map(|f| (binding.clone(), f))
                        .ok_or_else(|| BehaviorError::UnknownFamily {
                            binding: binding.clone(),
                            family: family.clone(),
                        })
                })
                .collect::<Result<_, _>>()?,
        };

        Ok(HandlerTable {
            version,
            label: self.label.clone(),
            operations,
            geometry,
            tuning: self.tuning,
        })
    }
}

fn builtin_operations() -> BTreeMap<String, OperationKind> {
    OperationKind::ALL
        .iter()
        .map(|k| (k.name().to_string(), *k))
        .collect()
}

fn builtin_geometry() -> BTreeMap<String, GeometryFamily> {
    GeometryFamily::ALL
        .iter()
        .map(|f| (f.name().to_string(), *f))
        .collect()
}

/// Parse and compile in one step.
pub fn compile_source(text: &str, version: u32) -> Result<HandlerTable, BehaviorError> {
    BehaviorDefinition::parse(text)?.compile(version)
}

/// A compiled, immutable set of bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerTable {
    /// Position of this table in the loader's history. The built-in table
    /// is version 0.
    pub version: u32,
    pub label: Option<String>,
    operations: BTreeMap<String, OperationKind>,
    geometry: BTreeMap<String, GeometryFamily>,
    pub tuning: Tuning,
}

impl HandlerTable {
    pub fn builtin() -> Self {
        Self {
            version: 0,
            label: Some("builtin".to_string()),
            operations: builtin_operations(),
            geometry: builtin_geometry(),
            tuning: Tuning::default(),
        }
    }

    pub fn operation(&self, name: &str) -> Option<OperationKind> {
        self.operations.get(name).copied()
    }

    pub fn geometry(&self, name: &str) -> Option<GeometryFamily> {
        self.geometry.get(name).copied()
    }

    /// Operation names this table accepts, sorted.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::builtin()
    }
}
