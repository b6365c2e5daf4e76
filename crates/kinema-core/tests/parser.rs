use kinema_core::keyframe::AnimatableValue;
use kinema_core::model::{ContentModel, LayerKind, MaskMode, MatteMode};
use kinema_core::value::Color;
use kinema_core::parse_str;
use serde_json::json;

fn doc(body: serde_json::Value) -> String {
    let mut base = json!({
        "v": "5.7.4",
        "ip": 0, "op": 60, "fr": 30, "w": 100, "h": 100,
        "layers": []
    });
    base.as_object_mut()
        .unwrap()
        .extend(body.as_object().unwrap().clone());
    base.to_string()
}

#[test]
fn malformed_json_is_the_only_fatal_error() {
    assert!(parse_str("{ not json", 1.0).is_err());
    assert!(parse_str(&doc(json!({})), 1.0).is_ok());
}

#[test]
fn old_exporter_version_warns_but_parses() {
    let comp = parse_str(&doc(json!({ "v": "4.4.0" })), 1.0).unwrap();
    assert_eq!(comp.warnings.len(), 1);
    assert!(comp.warnings[0].contains("4.4.0"));

    let comp = parse_str(&doc(json!({ "v": "4.11.1" })), 1.0).unwrap();
    assert!(comp.warnings.is_empty());
}

#[test]
fn negative_duration_clamps_with_warning() {
    let comp = parse_str(&doc(json!({ "ip": 30, "op": 10 })), 1.0).unwrap();
    assert_eq!(comp.frame_range.duration(), 0.0);
    assert_eq!(comp.warnings.len(), 1);
}

#[test]
fn layer_in_out_points_become_visibility_holds() {
    let comp = parse_str(
        &doc(json!({
            "layers": [{ "ty": 3, "nm": "Null", "ip": 10, "op": 40, "st": 0, "ks": {} }]
        })),
        1.0,
    )
    .unwrap();
    let AnimatableValue::Keyframes(frames) = &comp.layers[0].visibility else {
        panic!("expected keyframed visibility");
    };
    assert_eq!(frames.len(), 3);
    assert_eq!((frames[0].start_value, frames[0].end_frame), (0.0, Some(10.0)));
    assert_eq!((frames[1].start_value, frames[1].end_frame), (1.0, Some(40.0)));
    assert_eq!((frames[2].start_value, frames[2].end_frame), (0.0, None));
    assert!(frames.iter().all(|f| f.is_hold()));
}

#[test]
fn layer_visible_from_start_omits_leading_hold() {
    let comp = parse_str(
        &doc(json!({
            "layers": [{ "ty": 3, "ip": 0, "op": 60, "st": 0, "ks": {} }]
        })),
        1.0,
    )
    .unwrap();
    let AnimatableValue::Keyframes(frames) = &comp.layers[0].visibility else {
        panic!("expected keyframed visibility");
    };
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].start_value, 1.0);
}

#[test]
fn layer_outliving_the_composition_stays_visible_at_the_end() {
    // Out point past the composition end: the layer is on screen for the
    // whole playable range, including the final frame.
    let comp = parse_str(
        &doc(json!({
            "layers": [{ "ty": 3, "ip": 0, "op": 120, "st": 0, "ks": {} }]
        })),
        1.0,
    )
    .unwrap();
    let mut visibility = kinema_core::Timeline::new(comp.layers[0].visibility.clone());
    visibility.set_progress(1.0);
    assert_eq!(*visibility.value(), 1.0);
}

#[test]
fn transform_opacity_compiles_to_rounded_integers() {
    let comp = parse_str(
        &doc(json!({
            "layers": [
                { "ty": 3, "ip": 0, "op": 60, "st": 0, "ks": { "o": { "a": 0, "k": 45.4 } } },
                { "ty": 3, "ip": 0, "op": 60, "st": 0, "ks": {} }
            ]
        })),
        1.0,
    )
    .unwrap();
    assert!(matches!(
        comp.layers[0].transform.opacity,
        AnimatableValue::Static(45)
    ));
    // Absent opacity defaults fully opaque.
    assert!(matches!(
        comp.layers[1].transform.opacity,
        AnimatableValue::Static(100)
    ));
}

#[test]
fn solid_layer_parses_hex_color_and_size() {
    let comp = parse_str(
        &doc(json!({
            "layers": [{
                "ty": 1, "nm": "BG", "ip": 0, "op": 60, "st": 0, "ks": {},
                "sc": "#ff8000", "sw": 200, "sh": 100
            }]
        })),
        1.0,
    )
    .unwrap();
    let layer = &comp.layers[0];
    assert_eq!(layer.kind, LayerKind::Solid);
    assert_eq!(layer.solid_color, Some(Color::rgba(255, 128, 0, 255)));
    assert_eq!((layer.width, layer.height), (200, 100));
}

#[test]
fn unknown_layer_type_is_skipped_with_warning() {
    let comp = parse_str(
        &doc(json!({
            "layers": [
                { "ty": 13, "nm": "Camera", "ip": 0, "op": 60, "st": 0, "ks": {} },
                { "ty": 3, "nm": "Null", "ip": 0, "op": 60, "st": 0, "ks": {} }
            ]
        })),
        1.0,
    )
    .unwrap();
    assert_eq!(comp.layers.len(), 1);
    assert!(comp.warnings.iter().any(|w| w.contains("Camera")));
}

#[test]
fn unknown_shape_type_is_skipped_with_warning() {
    let comp = parse_str(
        &doc(json!({
            "layers": [{
                "ty": 4, "ip": 0, "op": 60, "st": 0, "ks": {},
                "shapes": [
                    { "ty": "zz", "nm": "ZigZag" },
                    { "ty": "el", "p": { "a": 0, "k": [0, 0] }, "s": { "a": 0, "k": [10, 10] } }
                ]
            }]
        })),
        1.0,
    )
    .unwrap();
    assert_eq!(comp.layers[0].contents.len(), 1);
    assert!(!comp.warnings.is_empty());
}

#[test]
fn luma_matte_degrades_to_alpha_with_warning() {
    let comp = parse_str(
        &doc(json!({
            "layers": [
                { "ty": 3, "ip": 0, "op": 60, "st": 0, "ks": {}, "td": 1 },
                { "ty": 3, "ip": 0, "op": 60, "st": 0, "ks": {}, "tt": 3 }
            ]
        })),
        1.0,
    )
    .unwrap();
    assert!(comp.layers[0].is_matte_source);
    assert_eq!(comp.layers[1].matte, Some(MatteMode::Add));
    assert!(comp.warnings.iter().any(|w| w.contains("luma")));
}

#[test]
fn illustrator_layer_gets_advisory_warning() {
    let comp = parse_str(
        &doc(json!({
            "layers": [{ "ty": 3, "nm": "logo.ai", "ip": 0, "op": 60, "st": 0, "ks": {} }]
        })),
        1.0,
    )
    .unwrap();
    assert!(comp.warnings.iter().any(|w| w.contains("Illustrator")));
}

#[test]
fn expression_bound_property_warns() {
    let comp = parse_str(
        &doc(json!({
            "layers": [{
                "ty": 3, "ip": 0, "op": 60, "st": 0,
                "ks": { "r": { "a": 0, "k": 45, "x": "var $bm_rt = time * 360;" } }
            }]
        })),
        1.0,
    )
    .unwrap();
    assert!(comp.warnings.iter().any(|w| w.contains("expressions")));
}

#[test]
fn gradient_opacity_stops_resample_alpha() {
    let comp = parse_str(
        &doc(json!({
            "layers": [{
                "ty": 4, "ip": 0, "op": 60, "st": 0, "ks": {},
                "shapes": [{
                    "ty": "gf",
                    "nm": "Gradient Fill 1",
                    "s": { "a": 0, "k": [0, 0] },
                    "e": { "a": 0, "k": [100, 0] },
                    "t": 1,
                    "g": {
                        "p": 2,
                        "k": {
                            "a": 0,
                            "k": [0.0, 1.0, 0.0, 0.0,  1.0, 0.0, 0.0, 1.0,  0.0, 0.5,  1.0, 1.0]
                        }
                    }
                }]
            }]
        })),
        1.0,
    )
    .unwrap();
    let ContentModel::GradientFill(fill) = &comp.layers[0].contents[0] else {
        panic!("expected gradient fill");
    };
    let AnimatableValue::Static(stops) = &fill.stops else {
        panic!("expected static stops");
    };
    assert_eq!(stops.colors[0].a, 127);
    assert_eq!(stops.colors[1].a, 255);
}

#[test]
fn masks_parse_modes_and_intersect_warns() {
    let comp = parse_str(
        &doc(json!({
            "layers": [{
                "ty": 3, "ip": 0, "op": 60, "st": 0, "ks": {},
                "masksProperties": [
                    {
                        "mode": "s",
                        "inv": true,
                        "pt": { "a": 0, "k": { "c": true, "v": [[0,0],[10,0],[10,10]], "i": [[0,0],[0,0],[0,0]], "o": [[0,0],[0,0],[0,0]] } },
                        "o": { "a": 0, "k": 100 }
                    },
                    {
                        "mode": "i",
                        "pt": { "a": 0, "k": { "c": true, "v": [[0,0],[10,0],[10,10]], "i": [[0,0],[0,0],[0,0]], "o": [[0,0],[0,0],[0,0]] } },
                        "o": { "a": 0, "k": 100 }
                    }
                ]
            }]
        })),
        1.0,
    )
    .unwrap();
    let masks = &comp.layers[0].masks;
    assert_eq!(masks[0].mode, MaskMode::Subtract);
    assert!(masks[0].inverted);
    assert_eq!(masks[1].mode, MaskMode::Intersect);
    assert!(comp.warnings.iter().any(|w| w.contains("intersect")));
}

#[test]
fn precomp_assets_and_references() {
    let comp = parse_str(
        &doc(json!({
            "assets": [
                {
                    "id": "comp_0",
                    "layers": [{ "ty": 3, "nm": "Inner", "ip": 0, "op": 60, "st": 0, "ks": {} }]
                },
                { "id": "image_0", "w": 32, "h": 32, "u": "images/", "p": "img_0.png" }
            ],
            "layers": [{
                "ty": 0, "nm": "Precomp", "refId": "comp_0",
                "ip": 0, "op": 60, "st": 0, "ks": {}, "w": 50, "h": 50
            }]
        })),
        1.0,
    )
    .unwrap();
    assert_eq!(comp.precomp("comp_0").map(<[_]>::len), Some(1));
    let image = &comp.images["image_0"];
    assert_eq!((image.width, image.height), (32, 32));
    assert_eq!(image.file_name.as_deref(), Some("img_0.png"));
    assert_eq!(comp.layers[0].ref_id.as_deref(), Some("comp_0"));
}

#[test]
fn fonts_and_glyphs_are_indexed() {
    let comp = parse_str(
        &doc(json!({
            "fonts": { "list": [{ "fName": "Inter-Bold", "fFamily": "Inter", "fStyle": "Bold", "ascent": 72.0 }] },
            "chars": [{ "ch": "a", "fFamily": "Inter", "style": "Bold", "size": 36.0, "w": 12.0,
                        "data": { "shapes": [] } }]
        })),
        1.0,
    )
    .unwrap();
    assert_eq!(comp.fonts["Inter-Bold"].family, "Inter");
    assert!(comp.characters.contains_key("aInterBold"));
}

#[test]
fn spatial_scale_applies_to_coordinates_and_dimensions() {
    let comp = parse_str(
        &doc(json!({
            "layers": [{
                "ty": 3, "ip": 0, "op": 60, "st": 0,
                "ks": { "p": { "a": 0, "k": [10, 20, 0] } }
            }]
        })),
        2.0,
    )
    .unwrap();
    assert_eq!((comp.width, comp.height), (200, 200));
    use kinema_core::animatable::AnimatablePosition;
    match &comp.layers[0].transform.position {
        AnimatablePosition::Unified(AnimatableValue::Static(p)) => {
            assert_eq!((p.x, p.y), (20.0, 40.0));
        }
        other => panic!("expected unified static position, got {other:?}"),
    }
}
