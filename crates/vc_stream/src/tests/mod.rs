//! Whole-graph tests over a small scene-graph registry.


use alloc::collections::BTreeMap;
use alloc::sync::Arc;

use vc_wrap::{Factory, ObjectRef, PropertyKind, RegistryError, TypeRegistry, Value, impl_object};

use self::fixtures::*;
use crate::format::FieldSink;
use crate::format::binary::BinarySink;
use crate::{
    ContentKind, DEFAULT_MAX_DEPTH, Format, Header, StreamError, StreamOptions, WIRE_FORMAT_MAJOR, from_bytes,
    from_bytes_with, load, load_with_header, save, save_with, to_bytes,
};

fn options(format: Format) -> StreamOptions {
    StreamOptions {
        format,
        ..StreamOptions::default()
    }
}

fn at_version(format: Format, version: u32) -> StreamOptions {
    StreamOptions {
        format,
        target_version: Some(version),
        ..StreamOptions::default()
    }
}

fn round_trip(registry: &TypeRegistry, root: &ObjectRef, options: &StreamOptions) -> ObjectRef {
    let bytes = to_bytes(registry, root, options).unwrap();
    from_bytes(registry, &bytes).unwrap().1
}

fn ascii(registry: &TypeRegistry, root: &ObjectRef, options: &StreamOptions) -> String {
    let options = StreamOptions {
        format: Format::Ascii,
        ..options.clone()
    };
    String::from_utf8(to_bytes(registry, root, &options).unwrap()).unwrap()
}

const FORMATS: [Format; 2] = [Format::Binary, Format::Ascii];

// -----------------------------------------------------------------------------
// Round trips

fn full_widget() -> Widget {
    let mut transform = IDENTITY;
    transform[12] = 10.0;
    transform[13] = -4.5;
    Widget {
        node: Node {
            object: ObjectBase {
                name: "shadowed".into(),
                variance: Variance::Dynamic,
            },
            node_mask: 0x0000_00f0,
            description: "dropped at revision 2".into(),
            culling_active: false,
        },
        placer: Placer {
            anchor: [0.5, 1.0],
            margin: [1.0, 2.0, 3.0],
        },
        caption: "button".into(),
        width: 2.5,
        offset: [1.5, -2.0],
        position: [1.0, 2.0, 3.0],
        background: [0.1, 0.2, 0.3, 0.4],
        rotation: [0.0, 0.0, core::f64::consts::FRAC_1_SQRT_2, core::f64::consts::FRAC_1_SQRT_2],
        transform,
        texture: Some(texture_with_image()),
        parent: None,
        label: "OK \"go\" {now}\n".into(),
    }
}

#[test]
fn every_kind_survives_both_formats() {
    let registry = registry();
    let root = group(vec![ObjectRef::new(full_widget())]);

    for format in FORMATS {
        let loaded = round_trip(&registry, &root, &options(format));
        assert!(!loaded.ptr_eq(&root));

        let children = get(&loaded, |g: &Group| g.children.clone());
        assert_eq!(children.len(), 1, "{format:?}");
        let widget = &children[0];

        get(widget, |w: &Widget| {
            assert_eq!(w.caption, "button");
            assert_eq!(w.node.object.name, "");
            assert_eq!(w.node.object.variance, Variance::Dynamic);
            assert_eq!(w.node.node_mask, 0xf0);
            assert!(!w.node.culling_active);
            assert_eq!(w.node.description, "", "removed property must not be written");
            assert_eq!(w.placer.anchor, [0.5, 1.0]);
            assert_eq!(w.placer.margin, [1.0, 2.0, 3.0]);
            assert_eq!(w.width, 2.5);
            assert_eq!(w.offset, [1.5, -2.0]);
            assert_eq!(w.position, [1.0, 2.0, 3.0]);
            assert_eq!(w.background, [0.1, 0.2, 0.3, 0.4]);
            assert_eq!(w.rotation, full_widget().rotation);
            assert_eq!(w.transform, full_widget().transform);
            assert!(w.parent.is_none());
            assert_eq!(w.label, "OK \"go\" {now}\n");
        });

        let texture = get(widget, |w: &Widget| w.texture.clone()).unwrap();
        get(&texture, |t: &Texture| {
            assert_eq!(t.object.name, "tex");
            assert_eq!(t.wrap_s, GL_CLAMP_TO_EDGE);
            assert_eq!(t.border_color, [0.25, 0.5, 0.75, 1.0]);
            assert_eq!(t.lod_bias, -0.5);
        });

        let image = get(&texture, |t: &Texture| t.image.clone()).unwrap();
        get(&image, |i: &Image| {
            assert_eq!(i.object.name, "checker");
            assert_eq!(i.object.variance, Variance::Static);
            assert_eq!(i.file_name, "checker.png");
            assert_eq!((i.width, i.height), (2, 2));
            assert_eq!(i.pixel_format, GL_RGB);
            assert_eq!(i.data, vec![0, 255, 0, 255, 0, 255, 0, 255, 0, 255, 0, 255]);
            assert_eq!(i.mipmap_offsets, vec![0, 12]);
            assert_eq!(i.modified, 3);
        });
    }
}

#[test]
fn empty_values_survive() {
    let registry = registry();
    let image = ObjectRef::new(Image::default());
    for format in FORMATS {
        let loaded = round_trip(&registry, &image, &options(format));
        get(&loaded, |i: &Image| {
            assert!(i.data.is_empty());
            assert!(i.mipmap_offsets.is_empty());
            assert_eq!(i.file_name, "");
            assert_eq!(i.pixel_format, GL_RGBA);
        });
    }
}

#[test]
fn shared_objects_keep_their_identity() {
    let registry = registry();
    let texture = texture_with_image();
    let a = ObjectRef::new(Widget {
        texture: Some(texture.clone()),
        ..widget(1.0, "a")
    });
    let b = ObjectRef::new(Widget {
        texture: Some(texture.clone()),
        ..widget(2.0, "b")
    });
    let root = group(vec![a, group(vec![b])]);

    for format in FORMATS {
        let loaded = round_trip(&registry, &root, &options(format));
        let children = get(&loaded, |g: &Group| g.children.clone());
        let inner = get(&children[1], |g: &Group| g.children.clone());

        let first = get(&children[0], |w: &Widget| w.texture.clone()).unwrap();
        let second = get(&inner[0], |w: &Widget| w.texture.clone()).unwrap();
        assert!(first.ptr_eq(&second), "{format:?}");
        assert!(!first.ptr_eq(&texture));
        assert_eq!(get(&inner[0], |w: &Widget| w.label.clone()), "b");
    }
}

#[test]
fn cycles_are_reconstructed() {
    let registry = registry();

    let looped = ObjectRef::new(widget(3.0, "self"));
    looped.with_mut(|w: &mut Widget| w.parent = Some(looped.clone())).unwrap();

    let child = ObjectRef::new(widget(4.0, "child"));
    let root = group(vec![child.clone()]);
    child.with_mut(|w: &mut Widget| w.parent = Some(root.clone())).unwrap();

    for format in FORMATS {
        let loaded = round_trip(&registry, &looped, &options(format));
        let parent = get(&loaded, |w: &Widget| w.parent.clone()).unwrap();
        assert!(parent.ptr_eq(&loaded), "{format:?}");
        loaded.with_mut(|w: &mut Widget| w.parent = None);

        let loaded = round_trip(&registry, &root, &options(format));
        let children = get(&loaded, |g: &Group| g.children.clone());
        let parent = get(&children[0], |w: &Widget| w.parent.clone()).unwrap();
        assert!(parent.ptr_eq(&loaded), "{format:?}");
        children[0].with_mut(|w: &mut Widget| w.parent = None);
    }

    // Break the cycles so the graphs are dropped.
    looped.with_mut(|w: &mut Widget| w.parent = None);
    child.with_mut(|w: &mut Widget| w.parent = None);
}

#[test]
fn io_entry_points() {
    let registry = registry();
    let root = ObjectRef::new(widget(2.0, "io"));

    let mut bytes = Vec::new();
    save(&registry, &root, &mut bytes, 1).unwrap();
    let loaded = load(&registry, &bytes[..]).unwrap();
    assert_eq!(get(&loaded, |w: &Widget| w.label.clone()), "io");

    let mut text = Vec::new();
    let options = StreamOptions {
        format: Format::Ascii,
        content: ContentKind::Scene,
        generator: "unit tests".into(),
        ..StreamOptions::default()
    };
    save_with(&registry, &root, &mut text, &options).unwrap();
    let (header, loaded) = load_with_header(&registry, &text[..]).unwrap();
    assert_eq!(header.format_major, WIRE_FORMAT_MAJOR);
    assert_eq!(header.content, ContentKind::Scene);
    assert_eq!(header.version, registry.latest_version());
    assert_eq!(header.generator, "unit tests");
    assert_eq!(get(&loaded, |w: &Widget| w.width), 2.0);
}

// -----------------------------------------------------------------------------
// Version gating

#[test]
fn properties_newer_than_the_target_are_left_out() {
    let registry = registry();
    let root = ObjectRef::new(Widget {
        node: Node {
            culling_active: false,
            ..Node::default()
        },
        ..widget(2.5, "hi")
    });

    let text = ascii(&registry, &root, &at_version(Format::Ascii, 0));
    assert!(text.contains("#Version 0\n"));
    assert!(text.contains("  Width 2.5\n"));
    assert!(!text.contains("Label"));
    assert!(!text.contains("CullingActive"));

    for format in FORMATS {
        let loaded = round_trip(&registry, &root, &at_version(format, 0));
        get(&loaded, |w: &Widget| {
            assert_eq!(w.width, 2.5);
            assert_eq!(w.label, "");
            assert!(w.node.culling_active);
        });
    }
}

#[test]
fn removed_properties_stay_readable_in_old_files() {
    let registry = registry();
    let root = ObjectRef::new(Node {
        description: "legacy".into(),
        ..Node::default()
    });

    assert!(ascii(&registry, &root, &at_version(Format::Ascii, 1)).contains("  Description \"legacy\"\n"));
    assert!(!ascii(&registry, &root, &at_version(Format::Ascii, 2)).contains("Description"));

    for format in FORMATS {
        let old = round_trip(&registry, &root, &at_version(format, 1));
        assert_eq!(get(&old, |n: &Node| n.description.clone()), "legacy");
        let new = round_trip(&registry, &root, &at_version(format, 2));
        assert_eq!(get(&new, |n: &Node| n.description.clone()), "");
    }
}

#[test]
fn custom_domains_gate_their_wrappers() {
    let registry = registry();
    let root = ObjectRef::new(Widget {
        placer: Placer {
            anchor: [0.25, 0.75],
            margin: [4.0, 5.0, 6.0],
        },
        ..widget(1.0, "ui")
    });

    // Without a domain entry the stream version applies.
    assert!(ascii(&registry, &root, &StreamOptions::default()).contains("  Margin 4 5 6\n"));

    let mut domains = BTreeMap::new();
    domains.insert("vcUi".to_string(), 1);
    let options = StreamOptions {
        custom_domains: domains,
        ..StreamOptions::default()
    };
    let text = ascii(&registry, &root, &options);
    assert!(text.contains("#CustomDomain vcUi 1\n"));
    assert!(text.contains("  Anchor 0.25 0.75\n"));
    assert!(!text.contains("Margin"));
    assert!(text.contains("  Label \"ui\"\n"));

    for format in FORMATS {
        let options = StreamOptions {
            format,
            ..options.clone()
        };
        let (header, loaded) = from_bytes(&registry, &to_bytes(&registry, &root, &options).unwrap()).unwrap();
        assert_eq!(header.domain_version(Some("vcUi")), 1);
        get(&loaded, |w: &Widget| {
            assert_eq!(w.placer.anchor, [0.25, 0.75]);
            assert_eq!(w.placer.margin, [0.0; 3]);
            assert_eq!(w.label, "ui");
        });
    }
}

#[test]
fn newer_class_versions_are_accepted() {
    let registry = registry();
    let root = ObjectRef::new(widget(6.0, "future"));
    let text = ascii(&registry, &root, &StreamOptions::default()).replace("Widget 1 {", "Widget 7 {");
    let (_, loaded) = from_bytes(&registry, text.as_bytes()).unwrap();
    assert_eq!(get(&loaded, |w: &Widget| w.width), 6.0);
}

// -----------------------------------------------------------------------------
// Unknown content

#[derive(Default)]
struct HolderV2 {
    extra: Option<ObjectRef>,
    notes: Vec<String>,
    main: Option<ObjectRef>,
    count: i32,
}

#[derive(Default)]
struct Holder {
    main: Option<ObjectRef>,
    count: i32,
}

impl_object!(HolderV2 => "Holder");
impl_object!(Holder => "Holder");

fn holder_v2_registry() -> TypeRegistry {
    let mut registry = registry();
    registry
        .register::<HolderV2>("Holder", Some(Factory::new(HolderV2::default)), &[], |decl| {
            decl.property("Extra", PropertyKind::Object, None, |h: &HolderV2| h.extra.clone(), |h, v| h.extra = v)
                .property(
                    "Notes",
                    PropertyKind::list(PropertyKind::String),
                    Vec::<String>::new(),
                    |h: &HolderV2| h.notes.clone(),
                    |h, v| h.notes = v,
                )
                .property("Main", PropertyKind::Object, None, |h: &HolderV2| h.main.clone(), |h, v| h.main = v)
                .property("Count", PropertyKind::Int, 0, |h: &HolderV2| h.count, |h, v| h.count = v);
        })
        .unwrap();
    registry
}

fn with_holder(mut registry: TypeRegistry) -> TypeRegistry {
    registry
        .register::<Holder>("Holder", Some(Factory::new(Holder::default)), &[], |decl| {
            decl.property("Main", PropertyKind::Object, None, |h: &Holder| h.main.clone(), |h, v| h.main = v)
                .property("Count", PropertyKind::Int, 0, |h: &Holder| h.count, |h, v| h.count = v);
        })
        .unwrap();
    registry
}

fn shared_texture_holder() -> ObjectRef {
    let texture = texture_with_image();
    texture.with_mut(|t: &mut Texture| t.lod_bias = 1.25).unwrap();
    ObjectRef::new(HolderV2 {
        extra: Some(texture.clone()),
        notes: vec!["a".into(), "b {c}".into()],
        main: Some(texture),
        count: 7,
    })
}

#[test]
fn unknown_fields_are_skipped() {
    let writer = holder_v2_registry();
    let reader = with_holder(registry());
    let root = shared_texture_holder();

    let text = ascii(&writer, &root, &StreamOptions::default());
    assert!(text.contains("  Extra Texture 0 {\n"));
    assert!(text.contains("  Main Texture 0 { UniqueID 2 }\n"));

    // Objects defined inside unknown fields are still built, so the later
    // reference resolves to the same instance in both formats.
    for format in FORMATS {
        let bytes = to_bytes(&writer, &root, &options(format)).unwrap();
        let (_, loaded) = from_bytes(&reader, &bytes).unwrap();
        let main = get(&loaded, |h: &Holder| {
            assert_eq!(h.count, 7);
            h.main.clone()
        });
        get(&main.unwrap(), |t: &Texture| {
            assert_eq!(t.lod_bias, 1.25, "{format:?}");
            assert!(t.image.is_some());
            assert!(t.dirty);
        });
    }
}

#[test]
fn reference_into_an_unreadable_field_is_an_error() {
    // The reader knows `Holder` but not `Texture`, so `Extra` can only be skipped.
    let writer = holder_v2_registry();
    let reader = with_holder(TypeRegistry::new());

    let text = ascii(&writer, &shared_texture_holder(), &StreamOptions::default());
    match from_bytes(&reader, text.as_bytes()) {
        Err(StreamError::MalformedField { path, reason }) => {
            assert_eq!(path, "Start/Holder/Main");
            assert!(reason.contains("#2"), "{reason}");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn unknown_types_fail_the_read() {
    let full = registry();
    let mut partial = TypeRegistry::empty();
    register_object(&mut partial).unwrap();
    register_node(&mut partial).unwrap();
    register_group(&mut partial).unwrap();

    let root = group(vec![ObjectRef::new(widget(1.0, "x"))]);
    for format in FORMATS {
        let bytes = to_bytes(&full, &root, &options(format)).unwrap();
        match from_bytes(&partial, &bytes) {
            Err(StreamError::Registry(RegistryError::UnknownType(name))) => assert_eq!(name, "Widget"),
            other => panic!("unexpected result {other:?}"),
        }
    }
}

#[test]
fn newer_wire_formats_are_rejected() {
    let registry = registry();
    let root = ObjectRef::new(widget(1.0, "x"));

    let mut bytes = to_bytes(&registry, &root, &options(Format::Binary)).unwrap();
    bytes[8..12].copy_from_slice(&2_u32.to_le_bytes());
    assert!(matches!(
        from_bytes(&registry, &bytes),
        Err(StreamError::UnsupportedVersion { found: 2, supported: 1 })
    ));

    let text = ascii(&registry, &root, &StreamOptions::default()).replace("#Format 1", "#Format 2");
    assert!(matches!(
        from_bytes(&registry, text.as_bytes()),
        Err(StreamError::UnsupportedVersion { found: 2, supported: 1 })
    ));
}

#[test]
fn unrecognized_input() {
    let registry = registry();
    assert!(matches!(from_bytes(&registry, b"PK\x03\x04"), Err(StreamError::Parse { .. })));
    assert!(matches!(from_bytes(&registry, b""), Err(StreamError::Parse { .. })));
}

// -----------------------------------------------------------------------------
// Malformed streams

fn binary_stream(body: impl FnOnce(&mut BinarySink)) -> Vec<u8> {
    let mut sink = BinarySink::new();
    sink.write_header(&Header::new(ContentKind::Object, 2));
    body(&mut sink);
    sink.into_bytes()
}

#[test]
fn mismatched_field_kind_names_the_field() {
    let registry = registry();
    let bytes = binary_stream(|sink| {
        sink.begin_definition(1, "Widget", 1);
        sink.begin_field("Width", &PropertyKind::Int);
        sink.write_scalar(&PropertyKind::Int, &Value::Int(3)).unwrap();
        sink.end_definition();
    });
    match from_bytes(&registry, &bytes) {
        Err(StreamError::MalformedField { path, reason }) => {
            assert_eq!(path, "Start/Widget/Width");
            assert!(reason.contains("INT"), "{reason}");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn invalid_kind_tag_is_malformed() {
    let registry = registry();
    let mut bytes = binary_stream(|sink| sink.begin_definition(1, "Widget", 1));
    bytes.extend_from_slice(&5_u32.to_le_bytes());
    bytes.extend_from_slice(b"Width");
    bytes.push(0x63);
    match from_bytes(&registry, &bytes) {
        Err(StreamError::MalformedField { path, reason }) => {
            assert_eq!(path, "Start/Widget");
            assert!(reason.contains("0x63"), "{reason}");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn truncated_stream_reports_offset() {
    let registry = registry();
    let bytes = to_bytes(&registry, &ObjectRef::new(widget(1.0, "cut")), &options(Format::Binary)).unwrap();
    let cut = &bytes[..bytes.len() - 3];
    assert!(matches!(
        from_bytes(&registry, cut),
        Err(StreamError::Parse { location: crate::Location::Byte(_), .. })
    ));
}

#[test]
fn bad_text_value_names_the_field() {
    let registry = registry();
    let text = ascii(&registry, &ObjectRef::new(widget(1.0, "x")), &StreamOptions::default())
        .replace("  Width 1\n", "  Width wide\n");
    match from_bytes(&registry, text.as_bytes()) {
        Err(StreamError::MalformedField { path, .. }) => assert_eq!(path, "Start/Widget/Width"),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn schema_only_wrappers_cannot_be_instantiated() {
    let registry = registry();
    let bytes = binary_stream(|sink| {
        sink.begin_definition(1, "Placer", 2);
        sink.end_definition();
    });
    assert!(matches!(
        from_bytes(&registry, &bytes),
        Err(StreamError::Registry(RegistryError::MissingFactory(name))) if name == "Placer"
    ));
}

#[test]
fn null_root_is_an_error() {
    let registry = registry();
    let bytes = binary_stream(|sink| sink.write_null());
    assert!(matches!(from_bytes(&registry, &bytes), Err(StreamError::Parse { .. })));
}

// -----------------------------------------------------------------------------
// Writing

struct Stray;
impl_object!(Stray => "Stray");

#[test]
fn unregistered_types_abort_the_write() {
    let registry = registry();
    let root = group(vec![ObjectRef::new(widget(1.0, "ok")), ObjectRef::new(Stray)]);

    for format in FORMATS {
        let mut sink = Vec::new();
        match save_with(&registry, &root, &mut sink, &options(format)) {
            Err(StreamError::UnregisteredType(name)) => assert_eq!(name, "Stray"),
            other => panic!("unexpected result {other:?}"),
        }
        assert!(sink.is_empty());
    }
}

#[test]
fn text_uses_symbolic_names() {
    let registry = registry();
    let root = ObjectRef::new(Texture {
        object: ObjectBase {
            name: "tex".into(),
            variance: Variance::Dynamic,
        },
        ..Texture::default()
    });
    let text = ascii(&registry, &root, &StreamOptions::default());
    assert!(text.starts_with("#Ascii Object\n#Format 1\n#Version 2\n#Generator vc_archive "));
    assert!(text.contains("\nTexture 0 {\n  UniqueID 1\n"));
    assert!(text.contains("  DataVariance DYNAMIC\n"));
    assert!(text.contains("  WrapS REPEAT\n"));
    assert!(text.contains("  Image NULL\n"));

    let image = ObjectRef::new(Image::default());
    let text = ascii(&registry, &image, &StreamOptions::default());
    assert!(text.contains("  PixelFormat GL_RGBA\n"));
    assert!(text.contains("  Data 0 { }\n"));
    assert!(text.contains("  MipmapOffsets 0 {\n  }\n"));
}

#[test]
fn omitted_defaults_read_back_unchanged() {
    let registry = registry();
    let root = ObjectRef::new(widget(2.5, ""));
    let options = StreamOptions {
        omit_defaults: true,
        ..StreamOptions::default()
    };

    let text = ascii(&registry, &root, &options);
    assert!(text.contains("  Width 2.5\n"));
    for name in ["Label", "NodeMask", "Transform", "Rotation", "Parent", "Anchor"] {
        assert!(!text.contains(name), "{name} should be omitted");
    }

    for format in FORMATS {
        let options = StreamOptions {
            format,
            ..options.clone()
        };
        let loaded = round_trip(&registry, &root, &options);
        get(&loaded, |w: &Widget| {
            assert_eq!(w.width, 2.5);
            assert_eq!(w.node.node_mask, 0xffff_ffff);
            assert_eq!(w.rotation, [0.0, 0.0, 0.0, 1.0]);
            assert_eq!(w.transform, IDENTITY);
        });
    }
}

#[test]
fn read_hooks_run_after_the_fields() {
    let registry = registry();
    let root = texture_with_image();
    for format in FORMATS {
        let loaded = round_trip(&registry, &root, &options(format));
        assert!(get(&loaded, |t: &Texture| t.dirty));
    }
    assert!(!get(&root, |t: &Texture| t.dirty));
}

#[test]
fn derived_property_shadows_the_ancestor_one() {
    let registry = registry();
    let root = ObjectRef::new(Widget {
        node: Node {
            object: named("from object"),
            ..Node::default()
        },
        caption: "from widget".into(),
        ..widget(1.0, "")
    });

    let text = ascii(&registry, &root, &StreamOptions::default());
    assert_eq!(text.matches("  Name ").count(), 1, "{text}");
    assert!(text.contains("  Name \"from widget\"\n"));
    assert!(!text.contains("from object"));

    for format in FORMATS {
        let loaded = round_trip(&registry, &root, &options(format));
        get(&loaded, |w: &Widget| {
            assert_eq!(w.caption, "from widget", "{format:?}");
            assert_eq!(w.node.object.name, "");
        });
    }
}

// -----------------------------------------------------------------------------
// Nesting limits

fn nested_groups(depth: usize) -> ObjectRef {
    let mut node = group(Vec::new());
    for _ in 1..depth {
        node = group(vec![node]);
    }
    node
}

/// Runs `f` where the stack is deep enough to reach the default limit.
fn on_large_stack<R: Send + 'static>(f: impl FnOnce() -> R + Send + 'static) -> R {
    std::thread::Builder::new()
        .stack_size(64 << 20)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap()
}

fn limited(format: Format, max_depth: usize) -> StreamOptions {
    StreamOptions {
        format,
        max_depth,
        ..StreamOptions::default()
    }
}

#[test]
fn deep_graphs_fail_the_write() {
    on_large_stack(|| {
        let registry = registry();
        let root = nested_groups(600);
        for format in FORMATS {
            match to_bytes(&registry, &root, &options(format)) {
                Err(StreamError::DepthExceeded { path, limit }) => {
                    assert_eq!(limit, DEFAULT_MAX_DEPTH);
                    assert!(path.starts_with("Start/Group/Children/Group/Children"), "{path}");
                }
                other => panic!("unexpected result {other:?}"),
            }
        }
    });

    let registry = registry();
    for format in FORMATS {

        let mut sink = Vec::new();
        let shallow = nested_groups(5);
        assert!(matches!(
            save_with(&registry, &shallow, &mut sink, &limited(format, 4)),
            Err(StreamError::DepthExceeded { limit: 4, .. })
        ));
        assert!(sink.is_empty());
        assert!(to_bytes(&registry, &shallow, &limited(format, 5)).is_ok());
    }
}

#[test]
fn deep_streams_fail_the_read() {
    // Far deeper than any stack allows, the limit has to stop it early.
    let depth = 5000_u32;
    let bytes = binary_stream(|sink| {
        for id in 1..=depth {
            sink.begin_definition(id, "Group", 0);
            sink.begin_field("Children", &PropertyKind::list(PropertyKind::Object));
            sink.begin_list(&PropertyKind::Object, 1);
        }
        sink.write_null();
        for _ in 1..=depth {
            sink.end_list();
            sink.end_definition();
        }
    });
    on_large_stack(move || {
        assert!(matches!(
            from_bytes(&registry(), &bytes),
            Err(StreamError::DepthExceeded { limit: DEFAULT_MAX_DEPTH, .. })
        ));
    });

    let registry = registry();
    for format in FORMATS {
        let bytes = to_bytes(&registry, &nested_groups(40), &options(format)).unwrap();
        assert!(matches!(
            from_bytes_with(&registry, &bytes, &limited(format, 39)),
            Err(StreamError::DepthExceeded { limit: 39, .. })
        ));
        assert!(from_bytes_with(&registry, &bytes, &limited(format, 40)).is_ok());
    }
}

// -----------------------------------------------------------------------------
// Registry integration

#[test]
fn auto_registration_builds_the_same_registry() {
    let mut registry = TypeRegistry::empty();
    assert_eq!(registry.auto_register().unwrap(), 7);
    registry.validate().unwrap();
    assert_eq!(registry.schema(), fixtures::registry().schema());

    let loaded = round_trip(&registry, &texture_with_image(), &options(Format::Ascii));
    assert!(get(&loaded, |t: &Texture| t.image.is_some()));
}

#[test]
fn streams_share_a_registry_across_threads() {
    let registry = Arc::new(registry());
    let handles: Vec<_> = (0..4_u8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                let format = FORMATS[usize::from(i % 2)];
                let root = ObjectRef::new(widget(f32::from(i), &i.to_string()));
                let loaded = round_trip(&registry, &root, &options(format));
                get(&loaded, |w: &Widget| (w.width, w.label.clone()))
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let (width, label) = handle.join().unwrap();
        assert_eq!(width, i as f32);
        assert_eq!(label, i.to_string());
    }
}
