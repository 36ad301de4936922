use super::baseline::{BaselineCapture, BaselineState};
use crate::ext_data::{
    read_coordinate_modifiers, read_modifiers, save_coordinate_modifiers, save_modifiers,
};
use crate::{
    BoneEffect, BoneLocation, BoneLocator, BoneModifier, Error, GameMode, HostAdapter,
    HostProfile, LoadFlags, NodeId, PluginData,
};
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::mpsc::{Receiver, Sender, channel};

/// Notifications sent to subscribers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ControllerEvent {
    /// New modifier data was loaded, empty modifiers were purged and bones re-resolved.
    /// Custom modifiers and effects may need to be re-added.
    NewDataLoaded { modifiers: usize },
}

/// Manages and applies bone modifiers for a single character.
///
/// All methods must be called from the host's main thread. The host drives the
/// controller with [`late_update`](Self::late_update) after its own animation pass and
/// [`end_of_frame`](Self::end_of_frame) once the frame is rendered.
pub struct BoneController {
    pub(crate) profile: HostProfile,
    pub(crate) locator: BoneLocator,
    pub(crate) modifiers: Vec<BoneModifier>,
    pub(crate) effects: Vec<Rc<dyn BoneEffect>>,

    pub(crate) baseline_state: BaselineState,
    pub(crate) capture: Option<BaselineCapture>,
    pub(crate) previous_anim_speed: Option<f32>,
    data_changed_pending: bool,

    needs_full_refresh: bool,
    pub(crate) needs_baseline_update: bool,
    pub(crate) current_coordinate: usize,

    last_card_data: Option<PluginData>,
    last_load_flags: LoadFlags,
    pub(crate) subscribers: Vec<Sender<ControllerEvent>>,
}

impl Default for BoneController {
    fn default() -> Self {
        Self::new(HostProfile::default())
    }
}

impl BoneController {
    pub fn new(profile: HostProfile) -> Self {
        Self {
            profile,
            locator: BoneLocator::new(),
            modifiers: Vec::new(),
            effects: Vec::new(),
            baseline_state: BaselineState::Unknown,
            capture: None,
            previous_anim_speed: None,
            data_changed_pending: false,
            needs_full_refresh: false,
            needs_baseline_update: false,
            current_coordinate: 0,
            last_card_data: None,
            last_load_flags: LoadFlags::ALL,
            subscribers: Vec::new(),
        }
    }

    pub fn profile(&self) -> &HostProfile {
        &self.profile
    }

    pub fn baseline_state(&self) -> BaselineState {
        self.baseline_state
    }

    pub fn is_capturing_baseline(&self) -> bool {
        self.capture.is_some()
    }

    pub fn is_data_changed_pending(&self) -> bool {
        self.data_changed_pending
    }

    pub fn needs_full_refresh(&self) -> bool {
        self.needs_full_refresh
    }

    /// Reloads every modifier (keeping the data) on the next update instead of applying.
    pub fn request_full_refresh(&mut self) {
        self.needs_full_refresh = true;
    }

    pub fn needs_baseline_update(&self) -> bool {
        self.needs_baseline_update
    }

    /// Recaptures baselines of bones the host shape system writes, on the next update.
    pub fn request_baseline_update(&mut self) {
        self.needs_baseline_update = true;
    }

    pub fn modifiers(&self) -> &[BoneModifier] {
        &self.modifiers
    }

    pub fn bone_effects(&self) -> &[Rc<dyn BoneEffect>] {
        &self.effects
    }

    pub fn current_coordinate(&self) -> usize {
        self.current_coordinate
    }

    /// Switches the active coordinate and schedules a data-changed pass.
    pub fn set_current_coordinate<H: HostAdapter + ?Sized>(&mut self, host: &mut H, coordinate: usize) {
        if self.current_coordinate == coordinate {
            return;
        }
        self.current_coordinate = coordinate;
        self.schedule_data_changed(host);
    }

    /// Receives [`ControllerEvent`]s. Dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> Receiver<ControllerEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, event: ControllerEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub(crate) fn position(&self, bone_name: &str, location: BoneLocation) -> Option<usize> {
        self.modifiers.iter().position(|m| m.matches(bone_name, location))
    }

    /// Finds a modifier. `Unknown` matches any location.
    pub fn modifier(&self, bone_name: &str, location: BoneLocation) -> Option<&BoneModifier> {
        self.modifiers.iter().find(|m| m.matches(bone_name, location))
    }

    pub fn modifier_mut(&mut self, bone_name: &str, location: BoneLocation) -> Option<&mut BoneModifier> {
        self.modifiers.iter_mut().find(|m| m.matches(bone_name, location))
    }

    /// Adds a modifier, resolves its bone and captures its baseline.
    ///
    /// An `Unknown` location is resolved first, so adding `("a", Unknown)` next to an
    /// existing `("a", BodyTop)` is rejected as a duplicate.
    pub fn add_modifier<H: HostAdapter + ?Sized>(
        &mut self,
        host: &mut H,
        modifier: BoneModifier,
    ) -> Result<&mut BoneModifier, Error> {
        if modifier.bone_name().is_empty() {
            return Err(Error::InvalidArgument {
                message: "bone name must not be empty".to_string(),
            });
        }
        let modifier = self.resolve_new(host, modifier);
        let duplicate = self
            .modifiers
            .iter()
            .any(|m| m.bone_name() == modifier.bone_name() && m.location() == modifier.location());
        if duplicate {
            return Err(Error::DuplicateModifier {
                bone: modifier.bone_name().to_string(),
                location: modifier.location().to_string(),
            });
        }
        let index = self.modifiers.len();
        self.modifiers.push(modifier);
        Ok(&mut self.modifiers[index])
    }

    pub(crate) fn insert_modifier<H: HostAdapter + ?Sized>(
        &mut self,
        host: &mut H,
        modifier: BoneModifier,
    ) -> usize {
        let modifier = self.resolve_new(host, modifier);
        self.modifiers.push(modifier);
        self.modifiers.len() - 1
    }

    /// Resolves the pending modifiers, then `modifier` itself, and captures its baseline.
    fn resolve_new<H: HostAdapter + ?Sized>(
        &mut self,
        host: &mut H,
        mut modifier: BoneModifier,
    ) -> BoneModifier {
        self.fill_in_transforms(host);
        let roots = host.roots();
        self.locator.assign_bone(host.scene(), &roots, &mut modifier);
        modifier.collect_baseline(host.scene());
        modifier
    }

    /// Removes a modifier and restores its bone.
    pub fn remove_modifier<H: HostAdapter + ?Sized>(
        &mut self,
        host: &mut H,
        bone_name: &str,
        location: BoneLocation,
    ) -> Option<BoneModifier> {
        let index = self.position(bone_name, location)?;
        let mut modifier = self.modifiers.remove(index);
        modifier.reset(host.scene_mut());
        host.request_shape_update();
        Some(modifier)
    }

    /// Registers an effect. Registering the same instance twice does nothing.
    pub fn add_bone_effect(&mut self, effect: Rc<dyn BoneEffect>) {
        if self.effects.iter().any(|e| Rc::ptr_eq(e, &effect)) {
            return;
        }
        self.effects.push(effect);
    }

    pub fn remove_bone_effect(&mut self, effect: &Rc<dyn BoneEffect>) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| !Rc::ptr_eq(e, effect));
        self.effects.len() != before
    }

    /// Names under `root` (the body root when `None`) that could be bones, sorted.
    /// Builds a fresh map; cache the result if it is needed repeatedly.
    pub fn all_possible_bone_names<H: HostAdapter + ?Sized>(
        &self,
        host: &H,
        root: Option<NodeId>,
    ) -> Vec<String> {
        let roots = host.roots();
        let Some(root) = root.or(roots.body) else {
            return Vec::new();
        };
        let mut names: Vec<String> = BoneLocator::create_bone_map(host.scene(), root, &roots)
            .into_keys()
            .filter(|name| self.profile.is_possible_bone(name))
            .collect();
        names.sort();
        names
    }

    /// Resolves every modifier whose bone is missing or was destroyed.
    ///
    /// Bones found while the baseline is known get their baseline right away; otherwise
    /// they would stay unapplied until the next capture.
    pub(crate) fn fill_in_transforms<H: HostAdapter + ?Sized>(&mut self, host: &mut H) {
        if self.modifiers.is_empty() {
            return;
        }
        let roots = host.roots();
        let mut resolved_any = false;
        {
            let scene = host.scene();
            for modifier in &mut self.modifiers {
                if modifier.bone().is_some_and(|b| scene.is_alive(b)) {
                    continue;
                }
                self.locator.assign_bone(scene, &roots, modifier);
                resolved_any |= modifier.bone().is_some();
            }
        }
        if !resolved_any {
            return;
        }

        self.merge_duplicate_modifiers(host);

        if self.baseline_state == BaselineState::Known {
            let scene = host.scene();
            for modifier in &mut self.modifiers {
                if modifier.bone().is_some() && modifier.baseline().is_none() {
                    modifier.collect_baseline(scene);
                }
            }
        }
    }

    /// Keeps one modifier per resolved `(name, location)`. An `Unknown` entry can resolve
    /// onto a location that gained its own entry in the meantime (e.g. one created for an
    /// effect); the earlier entry wins unless it is empty and the later one is not.
    fn merge_duplicate_modifiers<H: HostAdapter + ?Sized>(&mut self, host: &mut H) {
        let mut i = 1;
        while i < self.modifiers.len() {
            let current = &self.modifiers[i];
            let earlier = self.modifiers[..i].iter().position(|m| {
                m.location() != BoneLocation::Unknown
                    && m.location() == current.location()
                    && m.bone_name() == current.bone_name()
            });
            let Some(j) = earlier else {
                i += 1;
                continue;
            };
            if self.modifiers[j].is_empty() && !self.modifiers[i].is_empty() {
                self.modifiers.swap(i, j);
            }
            let mut dropped = self.modifiers.remove(i);
            log::debug!(
                "dropping duplicate modifier for '{}' at {}",
                dropped.bone_name(),
                dropped.location()
            );
            dropped.reset(host.scene_mut());
        }
    }

    pub(crate) fn clean_empty_modifiers<H: HostAdapter + ?Sized>(&mut self, host: &mut H) {
        let scene = host.scene_mut();
        self.modifiers.retain_mut(|m| {
            if m.is_empty() {
                m.reset(scene);
                false
            } else {
                true
            }
        });
    }

    fn schedule_data_changed<H: HostAdapter + ?Sized>(&mut self, host: &mut H) {
        self.clean_empty_modifiers(host);
        // Accessories finish loading during the frame; resolve at its end.
        self.data_changed_pending = true;
    }

    fn finish_data_changed<H: HostAdapter + ?Sized>(&mut self, host: &mut H) {
        self.data_changed_pending = false;
        self.fill_in_transforms(host);
        self.needs_baseline_update = false;
        let modifiers = self.modifiers.len();
        self.notify(ControllerEvent::NewDataLoaded { modifiers });
    }

    /// Advances frame-delayed work: the pending data-changed pass, then the baseline
    /// capture.
    pub fn end_of_frame<H: HostAdapter + ?Sized>(&mut self, host: &mut H) {
        if self.data_changed_pending {
            self.finish_data_changed(host);
        }
        if let Some(mut capture) = self.capture.take() {
            if !self.advance_baseline_capture(host, &mut capture) {
                self.capture = Some(capture);
            }
        }
    }

    /// Per-frame update; call after the host's animation has written its transforms.
    pub fn late_update<H: HostAdapter + ?Sized>(&mut self, host: &mut H) {
        if self.needs_full_refresh {
            let flags = self.last_load_flags;
            self.on_reload(host, None, GameMode::Unknown, true, flags);
            self.needs_full_refresh = false;
            return;
        }

        match self.baseline_state {
            BaselineState::Known => {
                if self.needs_baseline_update {
                    self.update_baseline(host);
                }
                self.apply_effects(host);
            }
            BaselineState::Unknown => self.start_baseline_capture(),
            BaselineState::Capturing => {}
        }

        self.needs_baseline_update = false;
    }

    /// Replaces the active coordinate's deltas with the ones stored on a coordinate.
    pub fn on_coordinate_being_loaded<H: HostAdapter + ?Sized>(
        &mut self,
        host: &mut H,
        data: Option<&PluginData>,
        maintain_state: bool,
    ) {
        if maintain_state {
            return;
        }

        let current = self.current_coordinate;
        for modifier in self.modifiers.iter_mut().filter(|m| m.is_coordinate_specific()) {
            modifier.data_mut(current).clear();
        }

        let slot_count = host.coordinate_count().max(current + 1);
        for loaded in read_coordinate_modifiers(data) {
            let index = match self.position(loaded.bone_name(), loaded.location()) {
                Some(index) => index,
                None => {
                    let modifier = BoneModifier::new(loaded.bone_name(), loaded.location());
                    self.insert_modifier(host, modifier)
                }
            };
            let target = &mut self.modifiers[index];
            target.make_coordinate_specific(slot_count);
            *target.data_mut(current) = *loaded.data(0);
        }

        self.schedule_data_changed(host);
    }

    pub fn on_coordinate_being_saved(&self) -> Option<PluginData> {
        save_coordinate_modifiers(&self.modifiers, self.current_coordinate)
    }

    pub fn on_card_being_saved(&self, game_mode: GameMode) -> Option<PluginData> {
        log::debug!("saving bone modifiers (mode {game_mode:?})");
        save_modifiers(&self.modifiers)
    }

    /// Reloads modifiers from card data.
    ///
    /// With `maintain_state` the current modifiers are kept and only re-resolved.
    /// Otherwise `flags` select which parts of the current set are replaced by `data`:
    /// face (head subtree), body (rest of the body) and clothes (accessories).
    pub fn on_reload<H: HostAdapter + ?Sized>(
        &mut self,
        host: &mut H,
        data: Option<&PluginData>,
        game_mode: GameMode,
        maintain_state: bool,
        flags: LoadFlags,
    ) {
        log::debug!("reloading bone modifiers (mode {game_mode:?}, maintain state {maintain_state})");
        {
            let scene = host.scene_mut();
            for modifier in &mut self.modifiers {
                modifier.reset(scene);
            }
        }

        self.cancel_baseline_capture(host);
        self.data_changed_pending = false;

        if !maintain_state {
            self.last_card_data = data.cloned();
            self.last_load_flags = flags;
            if flags.any() {
                let loaded = read_modifiers(data);
                self.merge_loaded(host, loaded, flags);
            }
        }

        self.schedule_data_changed(host);
    }

    /// Discards unsaved edits by reloading the card data seen by the last reload.
    pub fn revert_changes<H: HostAdapter + ?Sized>(&mut self, host: &mut H) {
        let data = self.last_card_data.take();
        let flags = self.last_load_flags;
        self.on_reload(host, data.as_ref(), GameMode::Unknown, false, flags);
    }

    fn merge_loaded<H: HostAdapter + ?Sized>(
        &mut self,
        host: &H,
        loaded: Vec<BoneModifier>,
        flags: LoadFlags,
    ) {
        if flags.all() {
            self.modifiers = loaded;
            return;
        }

        let (loaded_clothes, loaded_body): (Vec<_>, Vec<_>) =
            loaded.into_iter().partition(|m| m.location().is_accessory());

        if flags.body && flags.face {
            self.replace_where(loaded_body, |m| !m.location().is_accessory());
        } else if flags.body || flags.face {
            let (head, body) = self.head_and_body_bones(host);
            if flags.face {
                self.replace_where(loaded_body, |m| {
                    !m.location().is_accessory() && head.contains(m.bone_name())
                });
            } else {
                self.replace_where(loaded_body, |m| {
                    !m.location().is_accessory() && body.contains(m.bone_name())
                });
            }
        }

        if flags.clothes {
            self.replace_where(loaded_clothes, |m| m.location().is_accessory());
        }
    }

    /// Removes current modifiers matching `pred` and adds the loaded ones matching it.
    fn replace_where<F>(&mut self, loaded: Vec<BoneModifier>, pred: F)
    where
        F: Fn(&BoneModifier) -> bool,
    {
        self.modifiers.retain(|m| !pred(m));
        self.modifiers.extend(loaded.into_iter().filter(|m| pred(m)));
    }

    /// Bone names in the head subtree and in the rest of the body, from the live hierarchy.
    fn head_and_body_bones<H: HostAdapter + ?Sized>(&self, host: &H) -> (HashSet<String>, HashSet<String>) {
        let scene = host.scene();
        let Some(body_root) = host.roots().body else {
            log::warn!("no body root; selective reload matches no bones");
            return (HashSet::new(), HashSet::new());
        };

        let head: HashSet<String> = match scene.find_by_name(body_root, &self.profile.head_root_bone) {
            Some(head_root) => scene.subtree_names(head_root).into_iter().collect(),
            None => {
                log::warn!(
                    "head root '{}' not found; treating every body bone as body",
                    self.profile.head_root_bone
                );
                HashSet::new()
            }
        };
        let body = scene
            .subtree_names(body_root)
            .into_iter()
            .filter(|name| !head.contains(name))
            .collect();
        (head, body)
    }
}
