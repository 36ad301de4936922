use crate::test_host::{TestHost, assert_approx, assert_vec3_approx};
use crate::{BoneLocation, BoneLocator, BoneModifier, BoneModifierData, HostAdapter, Transform};
use glam::{Quat, Vec3};

fn resolved(host: &TestHost, name: &str) -> BoneModifier {
    let mut modifier = BoneModifier::new(name, BoneLocation::BodyTop);
    BoneLocator::new().assign_bone(host.scene(), &host.roots(), &mut modifier);
    modifier
}

#[test]
fn is_empty_uses_epsilon() {
    assert!(BoneModifierData::IDENTITY.is_empty());
    assert!(BoneModifierData::from_scale(Vec3::new(1.00001, 1.0, 0.99999)).is_empty());
    assert!(!BoneModifierData::from_scale(Vec3::new(1.2, 1.0, 1.0)).is_empty());
    assert!(!BoneModifierData::from_position(Vec3::new(0.0, 0.05, 0.0)).is_empty());
    assert!(!BoneModifierData::from_rotation(Vec3::new(0.0, 0.0, 10.0)).is_empty());

    let mut data = BoneModifierData::new(Vec3::splat(2.0), Vec3::ONE, Vec3::ONE);
    data.clear();
    assert!(data.is_empty());
}

#[test]
fn merge_multiplies_scale_and_adds_offsets() {
    let mut data = BoneModifierData::new(
        Vec3::new(2.0, 1.0, 1.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(10.0, 0.0, 0.0),
    );
    data.merge(&BoneModifierData::new(
        Vec3::new(1.5, 1.0, 0.5),
        Vec3::new(0.0, 0.5, 1.0),
        Vec3::new(5.0, 0.0, 0.0),
    ));
    assert_vec3_approx(data.scale, Vec3::new(3.0, 1.0, 0.5));
    assert_vec3_approx(data.position, Vec3::new(0.0, 1.5, 1.0));
    assert_vec3_approx(data.rotation, Vec3::new(15.0, 0.0, 0.0));
}

#[test]
fn euler_rotation_applies_z_then_x_then_y() {
    let data = BoneModifierData::from_rotation(Vec3::new(90.0, 90.0, 0.0));
    // Rotating +Z by X 90 gives -Y, which Y 90 leaves alone.
    let rotated = data.rotation_quat() * Vec3::Z;
    assert_vec3_approx(rotated, Vec3::new(0.0, -1.0, 0.0));

    let data = BoneModifierData::from_rotation(Vec3::new(0.0, 0.0, 90.0));
    assert_vec3_approx(data.rotation_quat() * Vec3::X, Vec3::Y);
}

#[test]
fn coordinate_specific_slots_are_seeded_from_default() {
    let mut modifier = BoneModifier::with_data(
        "chest_L",
        BoneLocation::BodyTop,
        vec![BoneModifierData::from_scale(Vec3::splat(2.0))],
    );
    assert!(!modifier.is_coordinate_specific());
    assert_vec3_approx(modifier.data(5).scale, Vec3::splat(2.0));

    modifier.make_coordinate_specific(3);
    assert!(modifier.is_coordinate_specific());
    assert_eq!(modifier.coordinate_data().len(), 3);
    modifier.data_mut(1).scale = Vec3::splat(3.0);
    assert_vec3_approx(modifier.data(0).scale, Vec3::splat(2.0));
    assert_vec3_approx(modifier.data(1).scale, Vec3::splat(3.0));
    // Out of range falls back to the default slot.
    assert_vec3_approx(modifier.data(7).scale, Vec3::splat(2.0));

    modifier.make_coordinate_specific(5);
    assert_eq!(modifier.coordinate_data().len(), 5);
    assert_vec3_approx(modifier.data(4).scale, Vec3::splat(2.0));
    assert_vec3_approx(modifier.data(1).scale, Vec3::splat(3.0));

    modifier.make_non_coordinate_specific(1);
    assert!(!modifier.is_coordinate_specific());
    assert_vec3_approx(modifier.data(0).scale, Vec3::splat(3.0));
}

#[test]
fn modifier_is_empty_only_when_every_slot_is_empty() {
    let mut modifier = BoneModifier::new("chest_L", BoneLocation::BodyTop);
    assert!(modifier.is_empty());
    modifier.make_coordinate_specific(3);
    modifier.data_mut(2).position = Vec3::X;
    assert!(!modifier.is_empty());
    modifier.data_mut(2).clear();
    assert!(modifier.is_empty());
}

#[test]
fn apply_scales_relative_to_baseline() {
    let mut host = TestHost::new();
    let mut modifier = resolved(&host, "chest_L");
    modifier.collect_baseline(host.scene());
    assert_eq!(modifier.baseline(), Some(&Transform::IDENTITY));

    modifier.data_mut(0).scale = Vec3::new(1.2, 1.0, 1.0);
    modifier.apply(host.scene_mut(), 0, &[]);

    let local = host.local("chest_L");
    assert_vec3_approx(local.scale, Vec3::new(1.2, 1.0, 1.0));
    assert_vec3_approx(local.position, Vec3::ZERO);
}

#[test]
fn identity_delta_leaves_baseline_untouched() {
    let mut host = TestHost::new();
    let pose = Transform {
        position: Vec3::new(0.1, 0.2, 0.3),
        rotation: Quat::from_rotation_y(0.5),
        scale: Vec3::new(1.1, 0.9, 1.0),
    };
    host.set_local("chest_L", pose);
    let mut modifier = resolved(&host, "chest_L");
    modifier.collect_baseline(host.scene());

    modifier.apply(host.scene_mut(), 0, &[]);

    assert_eq!(host.local("chest_L"), pose);
}

#[test]
fn untouched_channels_keep_host_animation() {
    let mut host = TestHost::new();
    let mut modifier = resolved(&host, "chest_L");
    modifier.collect_baseline(host.scene());
    modifier.data_mut(0).scale = Vec3::splat(2.0);

    // Host animation moves the bone after the baseline was taken.
    let mut animated = host.local("chest_L");
    animated.position = Vec3::new(0.0, 3.0, 0.0);
    host.set_local("chest_L", animated);

    modifier.apply(host.scene_mut(), 0, &[]);

    let local = host.local("chest_L");
    assert_vec3_approx(local.scale, Vec3::splat(2.0));
    assert_vec3_approx(local.position, Vec3::new(0.0, 3.0, 0.0));
}

#[test]
fn channel_returning_to_identity_restores_baseline_once() {
    let mut host = TestHost::new();
    let mut modifier = resolved(&host, "chest_L");
    modifier.collect_baseline(host.scene());

    modifier.data_mut(0).position = Vec3::new(0.0, 1.0, 0.0);
    modifier.apply(host.scene_mut(), 0, &[]);
    assert_vec3_approx(host.local("chest_L").position, Vec3::new(0.0, 1.0, 0.0));

    modifier.data_mut(0).clear();
    modifier.apply(host.scene_mut(), 0, &[]);
    assert_vec3_approx(host.local("chest_L").position, Vec3::ZERO);

    // From now on the host owns the channel again.
    let mut animated = host.local("chest_L");
    animated.position = Vec3::new(5.0, 0.0, 0.0);
    host.set_local("chest_L", animated);
    modifier.apply(host.scene_mut(), 0, &[]);
    assert_vec3_approx(host.local("chest_L").position, Vec3::new(5.0, 0.0, 0.0));
}

#[test]
fn reset_then_reapply_matches_single_apply() {
    let mut host = TestHost::new();
    let pose = Transform {
        position: Vec3::new(0.0, 1.0, 0.0),
        rotation: Quat::from_rotation_x(0.25),
        scale: Vec3::ONE,
    };
    host.set_local("chest_L", pose);
    let mut modifier = resolved(&host, "chest_L");
    *modifier.data_mut(0) = BoneModifierData::new(
        Vec3::new(1.5, 1.0, 1.0),
        Vec3::new(0.0, 0.25, 0.0),
        Vec3::new(0.0, 30.0, 0.0),
    );

    modifier.collect_baseline(host.scene());
    modifier.apply(host.scene_mut(), 0, &[]);
    let once = host.local("chest_L");

    modifier.reset(host.scene_mut());
    assert!(modifier.baseline().is_none());
    assert_eq!(host.local("chest_L"), pose);

    modifier.collect_baseline(host.scene());
    modifier.apply(host.scene_mut(), 0, &[]);
    let again = host.local("chest_L");

    assert_vec3_approx(again.scale, once.scale);
    assert_vec3_approx(again.position, once.position);
    assert_approx(again.rotation.dot(once.rotation).abs(), 1.0);
}

#[test]
fn apply_without_baseline_or_bone_is_a_no_op() {
    let mut host = TestHost::new();
    let mut modifier = resolved(&host, "chest_L");
    modifier.data_mut(0).scale = Vec3::splat(2.0);
    modifier.apply(host.scene_mut(), 0, &[]);
    assert_eq!(host.local("chest_L"), Transform::IDENTITY);

    let mut unresolved = BoneModifier::new("nowhere", BoneLocation::BodyTop);
    unresolved.data_mut(0).scale = Vec3::splat(2.0);
    unresolved.collect_baseline(host.scene());
    unresolved.apply(host.scene_mut(), 0, &[]);
    assert!(unresolved.baseline().is_none());
}

#[test]
fn destroyed_bone_is_forgotten_on_apply() {
    let mut host = TestHost::new();
    let mut modifier = BoneModifier::new("ribbon", BoneLocation::Accessory(2));
    BoneLocator::new().assign_bone(host.scene(), &host.roots(), &mut modifier);
    modifier.collect_baseline(host.scene());
    modifier.data_mut(0).scale = Vec3::splat(2.0);

    let slot = host.accessories[2].unwrap();
    host.scene.destroy(slot);
    modifier.apply(host.scene_mut(), 0, &[]);

    assert_eq!(modifier.bone(), None);
    assert!(modifier.baseline().is_none());
}

#[test]
fn extra_contributions_merge_with_authored_delta() {
    let mut host = TestHost::new();
    let mut modifier = resolved(&host, "chest_L");
    modifier.collect_baseline(host.scene());
    modifier.data_mut(0).scale = Vec3::new(1.2, 1.0, 1.0);

    let extra = [
        BoneModifierData::from_position(Vec3::new(0.0, 0.05, 0.0)),
        BoneModifierData::from_scale(Vec3::new(2.0, 1.0, 1.0)),
    ];
    modifier.apply(host.scene_mut(), 0, &extra);

    let local = host.local("chest_L");
    assert_vec3_approx(local.scale, Vec3::new(2.4, 1.0, 1.0));
    assert_vec3_approx(local.position, Vec3::new(0.0, 0.05, 0.0));
}

#[test]
fn location_ordering_partitions_body_and_accessories() {
    assert!(BoneLocation::Unknown < BoneLocation::BodyTop);
    assert!(BoneLocation::BodyTop < BoneLocation::ACCESSORY);
    assert!(BoneLocation::Accessory(3) > BoneLocation::Accessory(0));
    assert!(BoneLocation::Accessory(3).is_accessory());
    assert!(!BoneLocation::BodyTop.is_accessory());

    for location in [
        BoneLocation::Unknown,
        BoneLocation::BodyTop,
        BoneLocation::Accessory(0),
        BoneLocation::Accessory(17),
    ] {
        assert_eq!(BoneLocation::from_ordinal(location.ordinal()), location);
    }
    assert_eq!(BoneLocation::from_ordinal(-4), BoneLocation::Unknown);
    assert_eq!(BoneLocation::Accessory(4).to_string(), "Accessory4");
}

#[test]
fn huge_accessory_slots_stay_on_accessories() {
    let ordinal = BoneLocation::Accessory(u32::MAX).ordinal();
    assert_eq!(ordinal, i32::MAX);
    assert!(BoneLocation::from_ordinal(ordinal).is_accessory());

    let last_exact = BoneLocation::Accessory((i32::MAX - 2) as u32);
    assert_eq!(BoneLocation::from_ordinal(last_exact.ordinal()), last_exact);
}

#[test]
fn destroyed_bone_is_forgotten_on_reset() {
    let mut host = TestHost::new();
    let mut modifier = BoneModifier::new("ribbon", BoneLocation::Accessory(2));
    BoneLocator::new().assign_bone(host.scene(), &host.roots(), &mut modifier);
    modifier.collect_baseline(host.scene());
    modifier.data_mut(0).scale = Vec3::splat(2.0);
    modifier.apply(host.scene_mut(), 0, &[]);

    let slot = host.accessories[2].unwrap();
    host.scene.destroy(slot);
    modifier.reset(host.scene_mut());

    assert_eq!(modifier.bone(), None);
    assert!(modifier.baseline().is_none());
}
