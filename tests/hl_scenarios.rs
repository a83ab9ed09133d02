use dxhl::dxil::{
    ComponentType, InputPrimitive, InterpolationMode, MatrixOrientation, PrimitiveTopology,
    ResourceClass, ResourceKind, SamplerKind, SemanticKind, ShaderKind, TessellatorDomain,
    TessellatorOutputPrimitive, TessellatorPartitioning,
};
use dxhl::ir::test_utils::promote_allocas;
use dxhl::ir::{
    AddressSpace, BinaryOp, FunctionId, GlobalId, GlobalVariable, InstKind, Module, Value,
};
use dxhl::precise::{
    convert_precise_marker_calls, has_precise_attribute, has_precise_attribute_with_metadata,
    mark_precise_attribute_on_ptr_with_function_call,
};
use dxhl::{
    metadata, CBuffer, ComputeProps, DomainProps, FieldAnnotation, FunctionAnnotation,
    FunctionProps, GeometryProps, HlError, HlModule, HlOptions, HullProps, ParameterAnnotation,
    PixelProps, Resource, ResourceBinding, ResourceRegistry, ResourceTypeAnnotations,
    RootSignatureHandle, Sampler, ShaderModel, Signature, SignatureElement, SignatureKind,
    StructAnnotation, TypeSystem, VertexProps,
};
use pretty_assertions::assert_eq;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn void_function(module: &mut Module, name: &str) -> FunctionId {
    let void = module.void_type();
    let fn_ty = module.function_type(void, vec![]);
    module.add_function(name, fn_ty).unwrap()
}

fn global(module: &mut Module, name: &str) -> GlobalId {
    let i32_ty = module.int_type(32);
    module.add_global(GlobalVariable::new(name, i32_ty))
}

/// Everything observable about a module's side-tables.
#[derive(Debug, PartialEq)]
struct Snapshot {
    shader_model: Option<ShaderModel>,
    options: HlOptions,
    entry_function: Option<FunctionId>,
    entry_name: String,
    resources: ResourceRegistry,
    signatures: Vec<Signature>,
    root_signature: RootSignatureHandle,
    props: Vec<(FunctionId, Option<FunctionProps>)>,
    resource_types: ResourceTypeAnnotations,
    type_system: TypeSystem,
    used: Vec<GlobalId>,
    group_shared: Vec<GlobalId>,
}

impl Snapshot {
    fn of(hl: &HlModule<'_>, functions: &[FunctionId]) -> Self {
        Self {
            shader_model: hl.shader_model().copied(),
            options: hl.options(),
            entry_function: hl.entry_function(),
            entry_name: hl.entry_function_name().to_owned(),
            resources: hl.resources().clone(),
            signatures: SignatureKind::ALL
                .iter()
                .map(|&kind| hl.signature(kind).clone())
                .collect(),
            root_signature: hl.root_signature().clone(),
            props: functions
                .iter()
                .map(|&f| (f, hl.function_props(f).ok().copied()))
                .collect(),
            resource_types: hl.resource_type_annotations().clone(),
            type_system: hl.type_system().clone(),
            used: hl.used_globals().to_vec(),
            group_shared: hl.group_shared_variables().to_vec(),
        }
    }
}

struct Populated {
    functions: Vec<FunctionId>,
    srv_globals: [GlobalId; 3],
}

/// Fills every side-table of `hl`.
fn populate(hl: &mut HlModule<'_>) -> Populated {
    let module = hl.module_mut();
    let main = void_function(module, "main");
    let gs = void_function(module, "gs_main");
    let hs = void_function(module, "hs_main");
    let patch = void_function(module, "hs_patch");
    let ds = void_function(module, "ds_main");
    let vs = void_function(module, "vs_main");
    let ps = void_function(module, "ps_main");

    let cb = global(module, "$Globals");
    let sampler = global(module, "samp");
    let srv_globals = [global(module, "tA"), global(module, "tB"), global(module, "tC")];
    let uav = global(module, "out");
    let plane = global(module, "clip0");
    let f32_ty = module.f32_type();
    let tgsm = module.add_global(
        GlobalVariable::new("cache", f32_ty).with_address_space(AddressSpace::GroupShared),
    );
    let tex_ty = module.struct_type("class.Texture2D<float>", vec![f32_ty]);
    let cb_ty = module.struct_type("struct.Constants", vec![f32_ty, f32_ty]);

    hl.set_shader_model("cs_6_0".parse().unwrap());
    hl.set_options(HlOptions::DEFAULT_ROW_MAJOR | HlOptions::LEGACY_CBUFFER_LOAD);
    hl.set_entry_function(Some(main));
    hl.set_entry_function_name("main");

    hl.add_cbuffer(CBuffer::new(
        ResourceBinding::new(cb, "$Globals").with_register(0, 0),
        32,
    ));
    hl.add_sampler(Sampler::new(
        ResourceBinding::new(sampler, "samp").with_register(1, 2),
        SamplerKind::Comparison,
    ));
    for (i, &g) in srv_globals.iter().enumerate() {
        hl.add_srv(
            Resource::new(
                ResourceBinding::new(g, format!("t{i}")).with_register(0, i as u32),
                ResourceKind::Texture2D,
            )
            .with_component_type(ComponentType::F32),
        );
    }
    let mut rw = Resource::new(
        ResourceBinding::new(uav, "out").with_range_size(u32::MAX),
        ResourceKind::StructuredBuffer,
    )
    .with_element_stride(16);
    rw.globally_coherent = true;
    rw.rasterizer_ordered = true;
    hl.add_uav(rw);

    let input = hl.signature_mut(SignatureKind::Input);
    input.append_element(
        SignatureElement::new(
            "SV_DispatchThreadID",
            SemanticKind::DispatchThreadId,
            ComponentType::U32,
        )
        .with_shape(1, 3),
    );
    let mut texcoord =
        SignatureElement::new("TEXCOORD", SemanticKind::Arbitrary, ComponentType::F32)
            .with_interpolation(InterpolationMode::LinearCentroid);
    texcoord.semantic_indices = vec![1, 2];
    texcoord.start_row = Some(1);
    texcoord.start_col = Some(0);
    input.append_element(texcoord);
    hl.signature_mut(SignatureKind::Output).append_element(
        SignatureElement::new("SV_Target", SemanticKind::Target, ComponentType::F32)
            .with_shape(1, 4),
    );
    *hl.root_signature_mut() = RootSignatureHandle::from_serialized(vec![0x44, 0x58, 0x42, 0x43]);

    hl.add_function_props(main, ComputeProps { num_threads: [8, 8, 1] }.into());
    hl.add_function_props(
        gs,
        GeometryProps {
            input_primitive: InputPrimitive::Triangle,
            max_vertex_count: 12,
            instance_count: 2,
            stream_primitive_topologies: [
                PrimitiveTopology::TriangleStrip,
                PrimitiveTopology::Undefined,
                PrimitiveTopology::Undefined,
                PrimitiveTopology::PointList,
            ],
        }
        .into(),
    );
    hl.add_function_props(
        hs,
        HullProps {
            patch_constant_func: Some(patch),
            domain: TessellatorDomain::Tri,
            partitioning: TessellatorPartitioning::FractionalOdd,
            output_primitive: TessellatorOutputPrimitive::TriangleCw,
            input_control_points: 3,
            output_control_points: 3,
            max_tess_factor: 15.5,
        }
        .into(),
    );
    hl.add_function_props(
        ds,
        DomainProps {
            domain: TessellatorDomain::Quad,
            input_control_points: 4,
        }
        .into(),
    );
    let mut clip_planes = [None; 6];
    clip_planes[2] = Some(plane);
    hl.add_function_props(vs, VertexProps { clip_planes }.into());
    hl.add_function_props(
        ps,
        PixelProps {
            early_depth_stencil: true,
        }
        .into(),
    );

    hl.add_resource_type_annotation(tex_ty, ResourceClass::Srv, ResourceKind::Texture2D);
    let mut field = FieldAnnotation::new("scale", ComponentType::F32);
    field.cbuffer_offset = 16;
    field.matrix_orientation = MatrixOrientation::RowMajor;
    field.precise = true;
    hl.type_system_mut().add_struct_annotation(
        cb_ty,
        StructAnnotation {
            fields: vec![FieldAnnotation::new("bias", ComponentType::F32), field],
            cbuffer_size: 32,
        },
    );
    hl.add_function_annotation(
        ps,
        FunctionAnnotation {
            ret: ParameterAnnotation {
                semantic: Some("SV_Target".into()),
                ..ParameterAnnotation::default()
            },
            params: vec![ParameterAnnotation {
                interpolation_mode: InterpolationMode::Linear,
                semantic: Some("TEXCOORD0".into()),
                matrix_orientation: MatrixOrientation::RowMajor,
                ..ParameterAnnotation::default()
            }],
        },
    );

    hl.add_group_shared_variable(tgsm).unwrap();
    hl.used_globals_mut().push(cb);

    Populated {
        functions: vec![main, gs, hs, patch, ds, vs, ps],
        srv_globals,
    }
}

#[test]
fn emitted_metadata_restores_every_side_table() {
    init_tracing();
    let mut module = Module::new("shader");
    let (expected, functions) = {
        let mut hl = HlModule::new(&mut module);
        let populated = populate(&mut hl);
        hl.emit_hl_metadata().unwrap();
        (Snapshot::of(&hl, &populated.functions), populated.functions)
    };

    let mut hl = HlModule::new(&mut module);
    hl.load_hl_metadata().unwrap();
    assert_eq!(Snapshot::of(&hl, &functions), expected);
}

#[test]
fn reloading_twice_is_stable() {
    let mut module = Module::new("shader");
    let functions = {
        let mut hl = HlModule::new(&mut module);
        let populated = populate(&mut hl);
        hl.emit_hl_metadata().unwrap();
        populated.functions
    };

    let first = {
        let mut hl = HlModule::new(&mut module);
        hl.load_hl_metadata().unwrap();
        hl.emit_hl_metadata().unwrap();
        Snapshot::of(&hl, &functions)
    };
    let mut hl = HlModule::new(&mut module);
    hl.load_hl_metadata().unwrap();
    assert_eq!(Snapshot::of(&hl, &functions), first);
}

#[test]
fn removing_the_middle_srv_compacts_the_collection() {
    let mut module = Module::new("shader");
    let mut hl = HlModule::new(&mut module);
    let Populated { srv_globals, .. } = populate(&mut hl);
    let [a, b, c] = srv_globals;

    assert_eq!(hl.remove_resources(&[b]).unwrap(), 1);

    assert_eq!(hl.srvs().len(), 2);
    assert_eq!(hl.srv(0).unwrap().binding.global, a);
    assert_eq!(hl.srv(1).unwrap().binding.global, c);
    assert_eq!(hl.srv(1).unwrap().binding.id, 1);
    assert_eq!(
        hl.srv(2),
        Err(HlError::ResourceIndexOutOfRange {
            class: ResourceClass::Srv,
            index: 2,
            len: 2,
        })
    );
    assert!(!hl.module().contains_global(b));

    // The compacted registry survives a round trip.
    hl.emit_hl_metadata().unwrap();
    drop(hl);
    let mut hl = HlModule::new(&mut module);
    hl.load_hl_metadata().unwrap();
    let globals: Vec<GlobalId> = hl.srvs().iter().map(|r| r.binding.global).collect();
    assert_eq!(globals, vec![a, c]);
}

#[test]
fn compute_thread_group_size_survives_a_round_trip() {
    let mut module = Module::new("shader");
    let main = void_function(&mut module, "main");
    {
        let mut hl = HlModule::new(&mut module);
        hl.add_function_props(main, ComputeProps { num_threads: [8, 8, 1] }.into());
        hl.emit_hl_metadata().unwrap();
    }

    let mut hl = HlModule::new(&mut module);
    assert!(!hl.has_function_props(main));
    hl.load_hl_metadata().unwrap();
    let props = hl.function_props(main).unwrap();
    assert_eq!(props.shader_kind(), ShaderKind::Compute);
    assert_eq!(props.expect_compute().num_threads, [8, 8, 1]);
    assert!(props.hull().is_none());
}

#[test]
fn cleared_metadata_cannot_be_loaded() {
    let mut module = Module::new("shader");
    {
        let mut hl = HlModule::new(&mut module);
        populate(&mut hl);
        hl.emit_hl_metadata().unwrap();
        hl.clear_hl_metadata();
    }
    for name in metadata::RESERVED_NAMES {
        assert!(module.named_metadata(name).is_none(), "{name}");
    }
    let err = HlModule::new(&mut module).load_hl_metadata().unwrap_err();
    assert!(err.is_malformed_metadata());
}

#[test]
fn released_signatures_are_not_emitted() {
    let mut module = Module::new("shader");
    {
        let mut hl = HlModule::new(&mut module);
        populate(&mut hl);
        let input = hl.release_signature(SignatureKind::Input);
        assert_eq!(input.len(), 2);
        assert_eq!(hl.release_root_signature().serialized(), b"DXBC");
        hl.emit_hl_metadata().unwrap();
    }

    let mut hl = HlModule::new(&mut module);
    hl.load_hl_metadata().unwrap();
    assert!(hl.signature(SignatureKind::Input).is_empty());
    assert_eq!(hl.signature(SignatureKind::Output).len(), 1);
    assert!(hl.root_signature().is_empty());
}

fn set_version(module: &mut Module, major: i64, minor: i64) {
    let major = module.const_int(32, major);
    let minor = module.const_int(32, minor);
    let ops = vec![Some(module.md_value(major)), Some(module.md_value(minor))];
    let node = module.md_tuple(ops);
    module.set_named_metadata(metadata::VERSION, vec![node]);
}

#[test]
fn version_gate() {
    let mut module = Module::new("shader");
    let ps = void_function(&mut module, "ps_main");
    let t0 = global(&mut module, "t0");
    {
        let mut hl = HlModule::new(&mut module);
        hl.add_srv(Resource::new(ResourceBinding::new(t0, "t0"), ResourceKind::Texture2D));
        hl.add_function_props(ps, PixelProps::default().into());
        hl.emit_hl_metadata().unwrap();
    }

    // None of these records changed layout in minor 1.
    set_version(&mut module, 1, 0);
    {
        let mut hl = HlModule::new(&mut module);
        hl.load_hl_metadata().unwrap();
        assert_eq!(hl.srvs().len(), 1);
        assert!(hl.function_props(ps).unwrap().pixel().is_some());
    }

    set_version(&mut module, 2, 0);
    let err = HlModule::new(&mut module).load_hl_metadata().unwrap_err();
    assert_eq!(err, HlError::UnsupportedVersion { major: 2, minor: 0 });
    assert!(err.is_malformed_metadata());
}

#[test]
fn precise_marker_survives_register_promotion() {
    init_tracing();
    let mut module = Module::new("shader");
    let f32_ty = module.f32_type();
    let fn_ty = module.function_type(f32_ty, vec![f32_ty, f32_ty]);
    let main = module.add_function("main", fn_ty).unwrap();
    let (a, b) = (
        Value::Argument {
            function: main,
            index: 0,
        },
        Value::Argument {
            function: main,
            index: 1,
        },
    );

    // float r = a * b; (precise)  return r + a;
    let slot = module
        .append_inst(main, InstKind::Alloca { allocated: f32_ty })
        .unwrap();
    let product = module
        .append_inst(
            main,
            InstKind::Binary {
                op: BinaryOp::FMul,
                lhs: a,
                rhs: b,
            },
        )
        .unwrap();
    module
        .append_inst(
            main,
            InstKind::Store {
                ptr: slot.into(),
                value: product.into(),
            },
        )
        .unwrap();
    let reload = module
        .append_inst(main, InstKind::Load { ptr: slot.into() })
        .unwrap();
    let sum = module
        .append_inst(
            main,
            InstKind::Binary {
                op: BinaryOp::FAdd,
                lhs: reload.into(),
                rhs: a,
            },
        )
        .unwrap();
    module
        .append_inst(main, InstKind::Ret { value: Some(sum.into()) })
        .unwrap();

    mark_precise_attribute_on_ptr_with_function_call(&mut module, slot.into()).unwrap();
    assert!(!has_precise_attribute(&module, main));

    assert_eq!(promote_allocas(&mut module, main).unwrap(), 1);
    assert_eq!(convert_precise_marker_calls(&mut module).unwrap(), 1);

    assert!(has_precise_attribute_with_metadata(&module, product));
    assert!(!has_precise_attribute_with_metadata(&module, sum));
    assert!(has_precise_attribute(&module, main));

    // No marker calls or declarations remain.
    let body = module.function(main).unwrap().body();
    assert!(body
        .iter()
        .all(|&i| !matches!(module.inst(i).unwrap().kind(), InstKind::Call { .. })));
    assert_eq!(module.functions().count(), 1);
    assert_eq!(
        module.inst(sum).unwrap().kind(),
        &InstKind::Binary {
            op: BinaryOp::FAdd,
            lhs: product.into(),
            rhs: a,
        }
    );
}
