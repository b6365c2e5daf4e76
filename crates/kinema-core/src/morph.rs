//! Vertex-wise interpolation between two bezier contours of equal topology.

use crate::error::TopologyError;
use crate::value::{CubicCurve, ShapeData};

/// Interpolates `a` and `b` at `t`, allocating a fresh shape.
///
/// Shapes must share the same curve count; a mismatch is an authoring defect
/// in the document and is surfaced to the caller instead of being patched.
pub fn morph(a: &ShapeData, b: &ShapeData, t: f32) -> Result<ShapeData, TopologyError> {
    let mut out = ShapeData::default();
    morph_into(a, b, t, &mut out)?;
    Ok(out)
}

/// In-place variant reusing `out` as a scratch buffer. Timelines call this
/// once per frame; the result is valid until the next evaluation.
pub fn morph_into(
    a: &ShapeData,
    b: &ShapeData,
    t: f32,
    out: &mut ShapeData,
) -> Result<(), TopologyError> {
    if a.curves.len() != b.curves.len() {
        return Err(TopologyError {
            a: a.curves.len(),
            b: b.curves.len(),
        });
    }
    if t <= 0.0 {
        out.clone_from(a);
        return Ok(());
    }
    if t >= 1.0 {
        out.clone_from(b);
        return Ok(());
    }

    out.initial_point = a.initial_point.lerp(b.initial_point, t);
    out.closed = a.closed;
    out.curves.resize(a.curves.len(), CubicCurve::default());
    for (i, target) in out.curves.iter_mut().enumerate() {
        let ca = &a.curves[i];
        let cb = &b.curves[i];
        target.cp1 = ca.cp1.lerp(cb.cp1, t);
        target.cp2 = ca.cp2.lerp(cb.cp2, t);
        target.vertex = ca.vertex.lerp(cb.vertex, t);
    }
    Ok(())
}
