use glam::{Quat, Vec2, Vec3};
use golf_lvl::{
    format::LevelFile, AssetCache, Entity, EntityKind, FormatError, HeadlessGpu,
    Level, LevelError, LightmapImage, LightmapSection, Material, MaterialKind, MemoryStorage,
    Movement, Storage, Transform, LEVEL_FORMAT_VERSION,
};

const PATH: &str = "levels/hole1.lvl";

fn grass_level(gpu: &mut HeadlessGpu) -> Level {
    let mut level = Level::new();
    level
        .materials
        .push(Material::color(Vec3::new(0.0, 1.0, 0.0)).named("grass"));
    level.entities.push(Entity::hole(Transform::IDENTITY));
    level
        .entities
        .push(Entity::ball_start(Transform::from_position(Vec3::new(0.0, 0.0, 5.0))));
    level
        .lightmap_images
        .push(LightmapImage::new(gpu, "lm0", 16, 4, 4, vec![0; 16]));
    level
}

fn windmill_level(gpu: &mut HeadlessGpu) -> Level {
    let mut level = grass_level(gpu);
    let uvs = [Vec2::ZERO, Vec2::new(0.5, 0.0), Vec2::new(0.5, 0.5), Vec2::ONE];

    let mut movement = Movement::linear(Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0), 4.0);
    movement.advance(1.0);

    level.entities.push(Entity::model(
        Transform::from_position(Vec3::new(3.0, 0.0, 1.0)).with_scale(Vec3::splat(2.0)),
        "models/windmill.obj",
        LightmapSection::new(gpu, "lm0", &uvs, 1, 3),
        movement,
    ));
    level.materials.push(Material::texture("textures/sand.png").named("sand"));
    level.materials.push(Material::environment().named("sky"));
    level.materials[1].active = false;
    level
}

#[test]
fn grass_level_round_trip() {
    let mut gpu = HeadlessGpu::new();
    let mut storage = MemoryStorage::new();

    let mut original = grass_level(&mut gpu);
    original.save(&mut storage, PATH).unwrap();

    let mut loaded = Level::new();
    loaded.load_from(&storage, &mut gpu, PATH).unwrap();

    let grass = loaded.get_material("grass").unwrap();
    assert_eq!(grass.rgb(), Some(Vec3::new(0.0, 1.0, 0.0)));

    assert_eq!(loaded.entities.len(), 2);
    assert!(matches!(loaded.entities[0].kind, EntityKind::Hole { .. }));
    assert!(matches!(loaded.entities[1].kind, EntityKind::BallStart { .. }));
    assert_eq!(
        loaded.entities[1].transform().position,
        Vec3::new(0.0, 0.0, 5.0)
    );

    let lm0 = loaded.get_lightmap_image("lm0").unwrap();
    assert_eq!((lm0.width(), lm0.height()), (4, 4));
    assert!(lm0.texture().is_some());
    assert!(loaded.check_playable().is_empty());

    original.unload(&mut gpu);
    loaded.unload(&mut gpu);
    assert_eq!(gpu.live_textures(), 0);
}

#[test]
fn persisted_fields_survive_round_trip() {
    let mut gpu = HeadlessGpu::new();
    let mut original = windmill_level(&mut gpu);
    let bytes = original.save_to_bytes().unwrap();

    let mut loaded = Level::new();
    loaded.load(&mut gpu, PATH, &bytes).unwrap();
    assert_eq!(loaded.to_file().unwrap(), original.to_file().unwrap());

    // Inactive records keep their place and flag
    assert!(!loaded.materials[1].active);
    assert!(loaded.get_material("sand").is_none());
    assert!(loaded.get_material("sky").is_some());

    // Movement progress is persisted
    let world = loaded.entities[2].world_transform();
    assert_eq!(world.position, Vec3::new(0.0, 0.5, 0.0));
    assert_eq!(world.scale, Vec3::splat(2.0));

    original.unload(&mut gpu);
    loaded.unload(&mut gpu);
    assert_eq!(gpu.live_textures(), 0);
    assert_eq!(gpu.live_buffers(), 0);
}

#[test]
fn resolved_handles_are_not_persisted() {
    let mut gpu = HeadlessGpu::new();
    let mut cache: AssetCache<&str, &str> = AssetCache::new();
    let model = cache.insert_model("models/windmill.obj", "windmill");

    let mut level = windmill_level(&mut gpu);
    level.materials[1].active = true;
    let sand = cache.insert_texture("textures/sand.png", "sand");
    assert_eq!(level.resolve_assets(&mut cache), 0);
    assert_eq!(sand.holders(), 2);

    let bytes = level.save_to_bytes().unwrap();
    level.load(&mut gpu, PATH, &bytes).unwrap();

    assert!(level.entities[2].model_handle().is_none());
    assert!(matches!(
        &level.materials[1].kind,
        MaterialKind::Texture { texture: None, .. }
    ));

    // The previous contents released their references
    assert_eq!(model.holders(), 1);
    assert_eq!(sand.holders(), 1);
    assert_eq!(level.resolve_assets(&mut cache), 0);
    assert_eq!(model.holders(), 2);

    level.unload(&mut gpu);
    assert_eq!(model.holders(), 1);
}

#[test]
fn truncated_file_leaves_level_untouched() {
    let mut gpu = HeadlessGpu::new();
    let mut source = windmill_level(&mut gpu);
    let bytes = source.save_to_bytes().unwrap();
    source.unload(&mut gpu);

    let mut level = grass_level(&mut gpu);
    let before = level.to_file().unwrap();
    let created = gpu.total_created();

    // Cut the file in the middle of the last entity
    let truncated = &bytes[..bytes.len() - 20];
    let error = level.load(&mut gpu, PATH, truncated).unwrap_err();
    assert!(matches!(error, LevelError::Format(FormatError::Truncated)));

    assert_eq!(level.to_file().unwrap(), before);
    assert_eq!(gpu.total_created(), created);
    assert_eq!(gpu.live_textures(), 1);

    level.unload(&mut gpu);
}

#[test]
fn format_faults_are_classified() {
    let mut gpu = HeadlessGpu::new();
    let mut source = windmill_level(&mut gpu);
    let bytes = source.save_to_bytes().unwrap();
    source.unload(&mut gpu);

    let load = |data: &[u8]| {
        let mut gpu = HeadlessGpu::new();
        let mut level = Level::new();
        let result = level.load(&mut gpu, PATH, data);
        assert!(level.is_empty());
        match result {
            Err(LevelError::Format(error)) => error,
            other => panic!("expected a format error, got {other:?}"),
        }
    };

    let mut bad_magic = bytes.clone();
    bad_magic[0..4].copy_from_slice(b"GOLF");
    assert!(matches!(load(&bad_magic), FormatError::BadMagic(_)));

    // HEAD is the first child, its version right after its header
    let mut future = bytes.clone();
    assert_eq!(&future[8..12], b"HEAD");
    future[16..20].copy_from_slice(&(LEVEL_FORMAT_VERSION + 1).to_le_bytes());
    assert_eq!(
        load(&future),
        FormatError::UnsupportedVersion {
            found: LEVEL_FORMAT_VERSION + 1,
            supported: LEVEL_FORMAT_VERSION,
        }
    );

    let mut bad_tag = bytes.clone();
    let tag_offset = find_entity_info(&bad_tag) + 1;
    bad_tag[tag_offset..tag_offset + 4].copy_from_slice(&7u32.to_le_bytes());
    assert_eq!(
        load(&bad_tag),
        FormatError::InvalidTag {
            type_name: "EntityTag",
            value: 7
        }
    );

    let mut bad_uvs = bytes.clone();
    let count_offset = find(&bad_uvs, b"UVS_") + 8;
    bad_uvs[count_offset..count_offset + 4].copy_from_slice(&5u32.to_le_bytes());
    assert!(matches!(load(&bad_uvs), FormatError::InconsistentLength(_)));
}

#[test]
fn non_unit_rotation_is_rejected() {
    let mut gpu = HeadlessGpu::new();
    let mut level = grass_level(&mut gpu);
    let bytes = level.save_to_bytes().unwrap();

    // XFRM payload: position, then rotation as xyzw
    let mut stretched = bytes.clone();
    let w_offset = find(&stretched, b"XFRM") + 8 + 12 + 12;
    stretched[w_offset..w_offset + 4].copy_from_slice(&3.0f32.to_le_bytes());

    let before = level.to_file().unwrap();
    let error = level.load(&mut gpu, PATH, &stretched).unwrap_err();
    assert!(matches!(error, LevelError::Format(FormatError::Malformed(_))));
    assert_eq!(level.to_file().unwrap(), before);

    let mut nan_position = bytes.clone();
    let x_offset = find(&nan_position, b"XFRM") + 8;
    nan_position[x_offset..x_offset + 4].copy_from_slice(&f32::NAN.to_le_bytes());
    assert!(matches!(
        LevelFile::from_bytes(&nan_position),
        Err(FormatError::Malformed(_))
    ));

    level.entities[0].transform_mut().rotation = Quat::from_xyzw(0.0, 0.0, 0.0, 3.0);
    assert!(matches!(
        level.save_to_bytes(),
        Err(FormatError::Malformed(_))
    ));

    level.unload(&mut gpu);
}

#[test]
fn movement_progress_must_be_in_range() {
    let mut gpu = HeadlessGpu::new();
    let mut source = windmill_level(&mut gpu);
    let bytes = source.save_to_bytes().unwrap();
    source.unload(&mut gpu);

    // MOVE payload: kind, p0, p1, length, t
    let t_offset = find(&bytes, b"MOVE") + 8 + 4 + 12 + 12 + 4;
    for t in [f32::NAN, f32::INFINITY, -1.0, 4.5] {
        let mut patched = bytes.clone();
        patched[t_offset..t_offset + 4].copy_from_slice(&t.to_le_bytes());

        let mut level = Level::new();
        let error = level.load(&mut gpu, PATH, &patched).unwrap_err();
        assert!(
            matches!(error, LevelError::Format(FormatError::Malformed(_))),
            "t = {t} was accepted"
        );
        assert!(level.is_empty());
    }

    let mut patched = bytes.clone();
    patched[t_offset..t_offset + 4].copy_from_slice(&4.0f32.to_le_bytes());
    let mut level = Level::new();
    level.load(&mut gpu, PATH, &patched).unwrap();
    assert_eq!(
        level.entities[2].world_transform().position,
        Vec3::new(0.0, 2.0, 0.0)
    );

    level.unload(&mut gpu);
    assert_eq!(gpu.live_buffers(), 0);
}

#[test]
fn short_pixel_body_is_rejected() {
    let mut gpu = HeadlessGpu::new();
    let mut level = grass_level(&mut gpu);
    let mut file = level.to_file().unwrap();
    level.unload(&mut gpu);

    file.lightmap_images[0].data.pop();
    assert!(matches!(
        file.to_bytes(),
        Err(FormatError::InconsistentLength(_))
    ));
}

#[test]
fn missing_level_file_is_an_io_error() {
    let mut gpu = HeadlessGpu::new();
    let storage = MemoryStorage::new();
    let mut level = Level::new();
    let error = level.load_from(&storage, &mut gpu, PATH).unwrap_err();
    assert!(matches!(error, LevelError::Io(_)));
}

#[test]
fn saved_bytes_are_stable() {
    let mut gpu = HeadlessGpu::new();
    let mut level = windmill_level(&mut gpu);
    let mut storage = MemoryStorage::new();
    level.save(&mut storage, PATH).unwrap();
    level.save(&mut storage, "copy.lvl").unwrap();

    let bytes = storage.read_all(PATH).unwrap();
    assert_eq!(storage.get("copy.lvl"), Some(bytes.as_slice()));
    assert_eq!(LevelFile::from_bytes(&bytes).unwrap(), level.to_file().unwrap());

    level.unload(&mut gpu);
}

/// Offset of the first byte of the first entity's INFO payload.
fn find_entity_info(bytes: &[u8]) -> usize {
    let entity = find(bytes, b"ENTI");
    let info = entity + 8;
    assert_eq!(&bytes[info..info + 4], b"INFO");
    info + 8
}

fn find(bytes: &[u8], name: &[u8; 4]) -> usize {
    bytes
        .windows(4)
        .position(|window| window == name)
        .expect("node not found")
}
