use cad_authority::{AuthorityBundle, CurveId, PlaneRef, SketchConstraint, SketchId};
use profile_synth::units::mm_to_internal;
use profile_synth::{InternalCurve, PlanarCurve, Point2, SynthError};
use replay_types::RawOperation;
use serde::Deserialize;
use serde_json::Value;

use crate::error::OperationError;
use crate::interpreter::Interpreter;
use crate::resolve::sketch_plane;

/// Offsets at or below this many millimetres sketch on the base plane.
const OFFSET_EPSILON_MM: f64 = 0.001;

/// Geometry name that draws every entry of `items`.
const MULTI: &str = "multi";

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SketchParams {
    plane: String,
    offset: f64,
    geometry: String,
    params: Value,
    items: Vec<Value>,
    construction_geometry: Vec<Value>,
    constraints: Vec<Value>,
}

impl Default for SketchParams {
    fn default() -> Self {
        Self {
            plane: "XY".to_string(),
            offset: 0.0,
            geometry: "rectangle".to_string(),
            params: Value::Null,
            items: Vec::new(),
            construction_geometry: Vec::new(),
            constraints: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SketchItem {
    #[serde(rename = "type", default = "default_item_type")]
    kind: String,
    #[serde(default)]
    params: Value,
}

fn default_item_type() -> String {
    "circle".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ConstructionItem {
    #[serde(rename = "type")]
    kind: String,
    start: Point2,
    end: Point2,
    point: Point2,
}

impl Default for ConstructionItem {
    fn default() -> Self {
        Self {
            kind: "line".to_string(),
            start: [0.0, 0.0],
            end: [10.0, 0.0],
            point: [0.0, 0.0],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ConstraintItem {
    HorizontalVertical {
        entity_index: i64,
    },
    DimensionDiameter {
        entity_index: i64,
        #[serde(default = "default_diameter")]
        value: f64,
    },
}

fn default_diameter() -> f64 {
    10.0
}

/// Curves added to one sketch so far.
struct Drawing {
    sketch: SketchId,
    /// Non-point curves in creation order; constraints index into these.
    entities: Vec<CurveId>,
    points: usize,
}

impl Drawing {
    fn add(
        &mut self,
        kb: &mut dyn AuthorityBundle,
        curve: &PlanarCurve,
        construction: bool,
    ) -> Result<CurveId, OperationError> {
        let id = kb.add_curve(self.sketch, &InternalCurve::from_mm(curve), construction)?;
        if curve.is_curve() {
            self.entities.push(id);
        } else {
            self.points += 1;
        }
        Ok(id)
    }

    fn entity(&self, index: i64) -> Result<CurveId, OperationError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.entities.get(i).copied())
            .ok_or(OperationError::OutOfRange {
                what: "sketch curve",
                index,
                count: self.entities.len(),
            })
    }
}

pub(crate) fn sketch(it: &mut Interpreter<'_>, op: &RawOperation) -> Result<(), OperationError> {
    let p: SketchParams = op.decode()?;
    let base = sketch_plane(&p.plane)?;
    let component = it.design.active_id();

    let plane = if p.offset.abs() > OFFSET_EPSILON_MM {
        let id = it
            .kb
            .add_offset_plane(component, base, mm_to_internal(p.offset))?;
        it.journal
            .info(format!("Created offset plane from {} at {}mm", p.plane, p.offset));
        PlaneRef::Construction(id)
    } else {
        PlaneRef::Principal(base)
    };
    let sketch = it.kb.add_sketch(component, plane)?;
    it.design.record_sketch(sketch);

    let mut drawing = Drawing {
        sketch,
        entities: Vec::new(),
        points: 0,
    };

    for (i, item) in p.construction_geometry.iter().enumerate() {
        let drawn = draw_construction(it, &mut drawing, item);
        skip_item(it, &format!("construction geometry {i}"), drawn)?;
    }

    if p.geometry == MULTI {
        it.journal
            .info(format!("Multi-geometry sketch with {} items", p.items.len()));
        for (i, item) in p.items.iter().enumerate() {
            let drawn = serde_json::from_value::<SketchItem>(item.clone())
                .map_err(OperationError::from)
                .and_then(|item| draw_geometry(it, &mut drawing, &item.kind, &item.params));
            skip_item(it, &format!("sketch item {i}"), drawn)?;
        }
    } else {
        // Only an unknown family is skipped; bad parameters fail the sketch.
        match draw_geometry(it, &mut drawing, &p.geometry, &p.params) {
            Err(e) if e.is_unknown_geometry() => skip_item(it, &p.geometry, Err(e))?,
            drawn => drawn?,
        }
    }

    for (i, constraint) in p.constraints.iter().enumerate() {
        let applied = apply_constraint(it, &drawing, constraint);
        skip_item(it, &format!("constraint {i}"), applied)?;
    }

    it.journal.debug(format!(
        "Sketch {} on {}: {} curves, {} points",
        sketch.0,
        p.plane,
        drawing.entities.len(),
        drawing.points
    ));
    Ok(())
}

/// Report a failed sketch item as a warning and carry on, unless the host
/// itself failed.
fn skip_item(
    it: &mut Interpreter<'_>,
    what: &str,
    result: Result<(), OperationError>,
) -> Result<(), OperationError> {
    match result {
        Err(e) if e.is_host_fatal() => Err(e),
        Err(e) => {
            it.journal.warn(format!("Skipped {what}: {e}"));
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

fn draw_geometry(
    it: &mut Interpreter<'_>,
    drawing: &mut Drawing,
    name: &str,
    params: &Value,
) -> Result<(), OperationError> {
    let table = it.table;
    let family = table
        .geometry(name)
        .ok_or_else(|| SynthError::UnknownFamily {
            name: name.to_string(),
        })?;
    let curves = family.synthesize(params, &table.tuning.synth_options())?;
    for curve in &curves {
        drawing.add(&mut *it.kb, curve, false)?;
    }
    Ok(())
}

fn draw_construction(
    it: &mut Interpreter<'_>,
    drawing: &mut Drawing,
    item: &Value,
) -> Result<(), OperationError> {
    let item: ConstructionItem = serde_json::from_value(item.clone())?;
    let curve = match item.kind.as_str() {
        "line" => PlanarCurve::line(item.start, item.end),
        "point" => PlanarCurve::Point { at: item.point },
        other => {
            return Err(OperationError::invalid(format!(
                "unknown construction geometry type: {other}"
            )))
        }
    };
    drawing.add(&mut *it.kb, &curve, true)?;
    Ok(())
}

fn apply_constraint(
    it: &mut Interpreter<'_>,
    drawing: &Drawing,
    item: &Value,
) -> Result<(), OperationError> {
    let item: ConstraintItem = serde_json::from_value(item.clone())?;
    let constraint = match item {
        ConstraintItem::HorizontalVertical { entity_index } => {
            SketchConstraint::HorizontalOrVertical {
                curve: drawing.entity(entity_index)?,
            }
        }
        ConstraintItem::DimensionDiameter {
            entity_index,
            value,
        } => SketchConstraint::Diameter {
            curve: drawing.entity(entity_index)?,
            value: mm_to_internal(value),
        },
    };
    it.kb.add_constraint(drawing.sketch, constraint)?;
    Ok(())
}
