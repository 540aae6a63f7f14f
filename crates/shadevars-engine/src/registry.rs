//! Owner of every uniform the viewer knows about.
//!
//! Three sets live here:
//! - the static set: built-ins fed by the host (camera, clock, viewport, mouse, textures),
//! - the active set: what the currently installed program exposes, in driver order,
//! - the overflow set: permanent values from a vars file (or an earlier program) that the
//!   current program does not use. They are retried every time a program is installed.
//!
//! Keys never overlap between active and overflow.

use std::path::Path;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use crate::builtins::{Builtin, BuiltinMatrix, StaticSet};
use crate::codec;
use crate::config::{BuiltinTextures, DEFAULT_FIRST_TEXTURE_UNIT};
use crate::error::Result;
use crate::events::RegistryEvent;
use crate::introspect::{introspect, ActiveUniformSource, DiscoveredUniform};
use crate::keyed::KeyedSet;
use crate::target::{TextureUnits, UniformTarget};
use crate::value::UniformValue;
use crate::variable::{UniformKey, UniformVariable};
use crate::{loge, logi};

#[derive(Debug, Clone)]
enum ActiveEntry {
    /// The program binds a built-in; storage stays in the static set.
    Builtin(Builtin),
    Owned(UniformVariable),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// Built-ins are only ever replaced in place.
    Builtin,
    Unknown,
}

/// What a merge did with its candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub matched: usize,
    pub parked: usize,
    pub dropped: usize,
}

pub struct Registry {
    statics: StaticSet,
    active: KeyedSet<ActiveEntry>,
    overflow: KeyedSet<UniformVariable>,
    subscribers: Vec<Sender<RegistryEvent>>,
    clock: Instant,
    first_texture_unit: u32,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(&BuiltinTextures::default())
    }
}

impl Registry {
    pub fn new(textures: &BuiltinTextures) -> Self {
        Self {
            statics: StaticSet::new(textures),
            active: KeyedSet::new(),
            overflow: KeyedSet::new(),
            subscribers: Vec::new(),
            clock: Instant::now(),
            first_texture_unit: DEFAULT_FIRST_TEXTURE_UNIT,
        }
    }

    /// Texture units below `unit` are left to the host.
    pub fn with_first_texture_unit(mut self, unit: u32) -> Self {
        self.first_texture_unit = unit;
        self
    }

    /// Receive every notification emitted from now on.
    pub fn subscribe(&mut self) -> Receiver<RegistryEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, ev: RegistryEvent) {
        self.subscribers.retain(|tx| tx.send(ev.clone()).is_ok());
    }

    // ---------------------------------------------------------------------------------------
    // Program install
    // ---------------------------------------------------------------------------------------

    /// Introspect `program` and rebuild the active set from it.
    ///
    /// On error (an unsupported uniform type) nothing is touched.
    pub fn install_program(&mut self, program: &dyn ActiveUniformSource) -> Result<()> {
        let discovered = introspect(program)?;
        self.install_discovered(discovered);
        Ok(())
    }

    /// Replace the active set with `discovered`.
    ///
    /// Each entry takes its value from, in order: the built-in it names, a parked permanent
    /// value, the previous active value, or the variant default. Previous entries that were not
    /// rediscovered leave the active set; permanent ones are parked in overflow.
    pub fn install_discovered(&mut self, discovered: Vec<DiscoveredUniform>) {
        self.clock = Instant::now();

        for d in &discovered {
            self.emit(RegistryEvent::Discovered {
                key: d.key(),
                array_size: d.array_size,
            });
        }

        let mut previous = std::mem::take(&mut self.active);

        for d in discovered {
            let key = d.key();
            if self.active.contains(&key) {
                continue;
            }

            let was_active = previous.contains(&key);
            let entry = if let Some(b) = Builtin::for_key(&key) {
                previous.remove(&key);
                ActiveEntry::Builtin(b)
            } else if let Some(mut parked) = self.overflow.remove(&key) {
                previous.remove(&key);
                parked.array_size = d.array_size;
                let value = parked.value().format().unwrap_or_default();
                self.emit(RegistryEvent::ValueChanged {
                    key: key.clone(),
                    value,
                });
                ActiveEntry::Owned(parked)
            } else if let Some(ActiveEntry::Owned(mut kept)) = previous.remove(&key) {
                kept.array_size = d.array_size;
                ActiveEntry::Owned(kept)
            } else {
                let mut fresh = UniformVariable::with_default(d.name, d.variant);
                fresh.array_size = d.array_size;
                ActiveEntry::Owned(fresh)
            };

            self.active.insert(key.clone(), entry);
            if !was_active {
                self.emit(RegistryEvent::Added { key });
            }
        }

        for (key, entry) in previous.drain() {
            if let ActiveEntry::Owned(v) = entry {
                if v.permanent {
                    self.overflow.insert(key.clone(), v);
                }
            }
            self.emit(RegistryEvent::Deleted { key });
        }

        let (active, overflow) = (self.active.len(), self.overflow.len());
        logi!("REGISTRY", "program installed: {active} active, {overflow} parked");
        self.emit(RegistryEvent::ProgramInstalled { active, overflow });
    }

    // ---------------------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------------------

    /// Merge decoded candidates into the registry.
    ///
    /// The overflow set is replaced: a candidate matching an active entry updates it in place
    /// (permanence and payload) and emits `ValueChanged`; an unmatched permanent candidate is
    /// parked; anything else is dropped. Built-ins never take values from here.
    pub fn merge(&mut self, candidates: Vec<UniformVariable>) -> MergeReport {
        self.overflow.clear();
        let mut report = MergeReport::default();

        for v in candidates {
            let key = v.key();
            if Builtin::for_key(&key).is_some() {
                report.dropped += 1;
                continue;
            }

            if let Some(ActiveEntry::Owned(u)) = self.active.get_mut(&key) {
                u.permanent = v.permanent;
                if let Err(e) = u.set_value(v.value()) {
                    loge!("REGISTRY", "merge {key}: {e}");
                }
                let value = v.value().format().unwrap_or_default();
                report.matched += 1;
                self.emit(RegistryEvent::ValueChanged { key, value });
            } else if v.permanent {
                report.parked += 1;
                self.overflow.insert(key, v);
            } else {
                report.dropped += 1;
            }
        }
        report
    }

    /// Decode `path` and merge it. A file that fails to decode leaves everything untouched.
    pub fn load_from(&mut self, path: &Path) -> Result<MergeReport> {
        let candidates = codec::read_vars_file(path)?;
        Ok(self.merge(candidates))
    }

    pub fn load(&mut self, path: &Path) -> bool {
        match self.load_from(path) {
            Ok(r) => {
                logi!(
                    "VARS",
                    "loaded {}: {} matched, {} parked, {} dropped",
                    path.display(),
                    r.matched,
                    r.parked,
                    r.dropped
                );
                true
            }
            Err(e) => {
                loge!("VARS", "load {} failed: {e}", path.display());
                false
            }
        }
    }

    /// Write active (non built-in) entries followed by overflow. Returns the number of records
    /// written.
    pub fn save_to(&self, path: &Path) -> Result<usize> {
        codec::write_vars_file(path, self.saveable())
    }

    pub fn save(&self, path: &Path) -> bool {
        match self.save_to(path) {
            Ok(n) => {
                logi!("VARS", "saved {n} uniforms to {}", path.display());
                true
            }
            Err(e) => {
                loge!("VARS", "save {} failed: {e}", path.display());
                false
            }
        }
    }

    fn saveable(&self) -> impl Iterator<Item = &UniformVariable> {
        let owned = self.active.iter().filter_map(|(_, e)| match e {
            ActiveEntry::Owned(v) => Some(v),
            ActiveEntry::Builtin(_) => None,
        });
        owned.chain(self.overflow.iter().map(|(_, v)| v))
    }

    // ---------------------------------------------------------------------------------------
    // Editing
    // ---------------------------------------------------------------------------------------

    /// Append `var` to the active set. Refuses built-in keys and keys already active.
    ///
    /// A parked entry with the same key is promoted instead, keeping its payload and
    /// permanence, exactly as a program install would.
    pub fn add(&mut self, var: UniformVariable) -> bool {
        let key = var.key();
        if Builtin::for_key(&key).is_some() || self.active.contains(&key) {
            return false;
        }
        let var = match self.overflow.remove(&key) {
            Some(mut parked) => {
                parked.array_size = var.array_size;
                let value = parked.value().format().unwrap_or_default();
                self.emit(RegistryEvent::ValueChanged {
                    key: key.clone(),
                    value,
                });
                parked
            }
            None => var,
        };
        self.active.insert(key.clone(), ActiveEntry::Owned(var));
        self.emit(RegistryEvent::Added { key });
        true
    }

    pub fn remove(&mut self, key: &UniformKey) -> RemoveOutcome {
        if Builtin::for_key(key).is_some() {
            return RemoveOutcome::Builtin;
        }
        match self.active.remove(key) {
            Some(_) => {
                self.emit(RegistryEvent::Deleted { key: key.clone() });
                RemoveOutcome::Removed
            }
            None => RemoveOutcome::Unknown,
        }
    }

    /// Look up an active entry, resolving built-in bindings to the static set.
    pub fn get(&self, key: &UniformKey) -> Option<&UniformVariable> {
        match self.active.get(key)? {
            ActiveEntry::Builtin(b) => Some(self.statics.get(*b)),
            ActiveEntry::Owned(v) => Some(v),
        }
    }

    fn get_mut(&mut self, key: &UniformKey) -> Option<&mut UniformVariable> {
        match self.active.get_mut(key)? {
            ActiveEntry::Builtin(b) => Some(self.statics.get_mut(*b)),
            ActiveEntry::Owned(v) => Some(v),
        }
    }

    /// Overwrite an active value. `Ok(false)` when `key` is not active.
    pub fn set_value(&mut self, key: &UniformKey, value: &UniformValue) -> Result<bool> {
        let Some(var) = self.get_mut(key) else {
            return Ok(false);
        };
        var.set_value(value)?;
        let text = value.format().unwrap_or_default();
        self.emit(RegistryEvent::ValueChanged {
            key: key.clone(),
            value: text,
        });
        Ok(true)
    }

    /// Like `set_value`, parsing `text` in the entry's own variant.
    pub fn set_value_text(&mut self, key: &UniformKey, text: &str) -> Result<bool> {
        let Some(var) = self.get(key) else {
            return Ok(false);
        };
        let value = UniformValue::parse(var.variant(), text)?;
        self.set_value(key, &value)
    }

    /// Only user uniforms carry a permanence flag.
    pub fn set_permanent(&mut self, key: &UniformKey, yes: bool) -> bool {
        match self.active.get_mut(key) {
            Some(ActiveEntry::Owned(v)) => {
                v.permanent = yes;
                true
            }
            _ => false,
        }
    }

    pub fn is_builtin(&self, key: &UniformKey) -> bool {
        Builtin::for_key(key).is_some()
    }

    /// Active entries in driver order, built-ins resolved.
    pub fn active(&self) -> impl Iterator<Item = (&UniformKey, &UniformVariable)> {
        self.active.iter().map(move |(k, e)| match e {
            ActiveEntry::Builtin(b) => (k, self.statics.get(*b)),
            ActiveEntry::Owned(v) => (k, v),
        })
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn overflow(&self) -> impl Iterator<Item = &UniformVariable> {
        self.overflow.iter().map(|(_, v)| v)
    }

    pub fn overflow_len(&self) -> usize {
        self.overflow.len()
    }

    /// Drop one parked value.
    pub fn discard_overflow(&mut self, key: &UniformKey) -> bool {
        self.overflow.remove(key).is_some()
    }

    pub fn clear_overflow(&mut self) {
        self.overflow.clear();
    }

    // ---------------------------------------------------------------------------------------
    // Built-ins
    // ---------------------------------------------------------------------------------------

    pub fn statics(&self) -> &StaticSet {
        &self.statics
    }

    pub fn set_builtin(&mut self, b: Builtin, value: &UniformValue) -> Result<()> {
        self.statics.set(b, value)
    }

    /// `rows` is row-major, like every stored Mat4.
    pub fn set_matrix(&mut self, m: BuiltinMatrix, rows: [f32; 16]) {
        *self.statics.get_mut(m.into()).value_mut() = UniformValue::Mat4(rows);
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        *self.statics.get_mut(Builtin::Size).value_mut() = UniformValue::Vec2([width, height]);
    }

    /// `z` carries the button state: 1 while pressed.
    pub fn set_mouse(&mut self, x: f32, y: f32, pressed: bool) {
        let z = if pressed { 1.0 } else { 0.0 };
        *self.statics.get_mut(Builtin::Mouse).value_mut() = UniformValue::Vec3([x, y, z]);
    }

    pub fn reset_clock(&mut self) {
        self.clock = Instant::now();
    }

    /// Seconds since the last install or clock reset.
    pub fn elapsed(&self) -> f32 {
        self.clock.elapsed().as_secs_f32()
    }

    // ---------------------------------------------------------------------------------------
    // Per-frame upload
    // ---------------------------------------------------------------------------------------

    fn tick(&mut self) {
        let t = self.elapsed();
        *self.statics.get_mut(Builtin::Time).value_mut() = UniformValue::Time(t);
    }

    /// Upload every active value into the bound program.
    ///
    /// Samplers get consecutive texture units starting at the configured first unit.
    pub fn push(&mut self, target: &mut dyn UniformTarget) {
        self.tick();
        let mut units = TextureUnits::new(self.first_texture_unit);
        let Registry { statics, active, .. } = self;
        for (key, entry) in active.iter_mut() {
            let var = match entry {
                ActiveEntry::Builtin(b) => statics.get_mut(*b),
                ActiveEntry::Owned(v) => v,
            };
            var.value_mut().upload(&key.name, &mut units, target);
        }
    }

    /// Upload selected built-ins into a host-owned program (skybox pass, overlays).
    pub fn push_builtins(&mut self, which: &[Builtin], target: &mut dyn UniformTarget) {
        self.tick();
        let mut units = TextureUnits::new(self.first_texture_unit);
        for &b in which {
            self.statics
                .get_mut(b)
                .value_mut()
                .upload(b.name(), &mut units, target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::tests::FakeProgram;
    use crate::target::tests::RecordingTarget;
    use crate::target::SamplerKind;
    use crate::value::Variant;

    fn program() -> FakeProgram {
        FakeProgram::default()
            .with("gain", glow::FLOAT, 1)
            .with("tint", glow::FLOAT_VEC3, 1)
            .with("time", glow::FLOAT, 1)
            .with("gl_FragCoord", glow::FLOAT_VEC4, 1)
            .with("albedo", glow::SAMPLER_2D, 1)
    }

    fn key(name: &str, v: Variant) -> UniformKey {
        UniformKey::new(name, v)
    }

    fn drain(rx: &Receiver<RegistryEvent>) -> Vec<RegistryEvent> {
        rx.try_iter().collect()
    }

    fn temp_vars(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("shadevars-reg-{tag}-{}.vars", std::process::id()))
    }

    #[test]
    fn install_builds_active_set_in_driver_order() {
        let mut r = Registry::default();
        let rx = r.subscribe();
        r.install_program(&program()).unwrap();

        let names: Vec<_> = r.active().map(|(k, _)| k.to_string()).collect();
        assert_eq!(names, ["gain:float", "tint:float3", "time:float", "albedo:tex2d"]);
        assert_eq!(r.get(&key("time", Variant::Scalar)).unwrap().variant(), Variant::Time);

        let ev = drain(&rx);
        assert!(matches!(&ev[0], RegistryEvent::Discovered { key, .. } if key.name == "gain"));
        assert!(matches!(ev.last(), Some(RegistryEvent::ProgramInstalled { active: 4, overflow: 0 })));
        let added = ev.iter().filter(|e| matches!(e, RegistryEvent::Added { .. })).count();
        assert_eq!(added, 4);
    }

    #[test]
    fn unsupported_type_leaves_registry_untouched() {
        let mut r = Registry::default();
        r.install_program(&program()).unwrap();
        let bad = FakeProgram::default().with("m", glow::FLOAT_MAT3, 1);
        assert!(r.install_program(&bad).is_err());
        assert_eq!(r.active_len(), 4);
    }

    #[test]
    fn merge_applies_matches_parks_permanent_and_drops_the_rest() {
        let mut r = Registry::default();
        r.install_program(&program()).unwrap();
        let rx = r.subscribe();

        let report = r.merge(vec![
            UniformVariable::new("gain", UniformValue::Scalar(0.75)).permanent(true),
            UniformVariable::new("gain", UniformValue::Vec2([1.0, 2.0])),
            UniformVariable::new("ghost", UniformValue::Scalar(3.0)).permanent(true),
            UniformVariable::new("fleeting", UniformValue::Scalar(4.0)),
        ]);
        assert_eq!(report, MergeReport { matched: 1, parked: 1, dropped: 2 });

        let gain = r.get(&key("gain", Variant::Scalar)).unwrap();
        assert!(gain.permanent);
        assert_eq!(gain.value(), &UniformValue::Scalar(0.75));
        let parked: Vec<_> = r.overflow().map(|v| v.name().to_string()).collect();
        assert_eq!(parked, ["ghost"]);

        assert_eq!(
            drain(&rx),
            vec![RegistryEvent::ValueChanged {
                key: key("gain", Variant::Scalar),
                value: "0.75".into()
            }]
        );
    }

    #[test]
    fn merge_is_deterministic() {
        let candidates = || {
            vec![
                UniformVariable::new("tint", UniformValue::Vec3([1.0, 0.5, 0.0])),
                UniformVariable::new("gain", UniformValue::Scalar(2.0)),
                UniformVariable::new("other", UniformValue::Scalar(1.0)).permanent(true),
            ]
        };
        let run = || {
            let mut r = Registry::default();
            r.install_program(&program()).unwrap();
            let rx = r.subscribe();
            r.merge(candidates());
            let active: Vec<_> = r.active().map(|(_, v)| v.clone()).collect();
            let overflow: Vec<_> = r.overflow().cloned().collect();
            (active, overflow, drain(&rx))
        };
        let (a1, o1, e1) = run();
        let (a2, o2, e2) = run();
        assert_eq!(a1, a2);
        assert_eq!(o1, o2);
        assert_eq!(e1, e2);
        assert_eq!(e1.len(), 2);
    }

    #[test]
    fn builtins_are_immune_to_merge_and_delete() {
        let mut r = Registry::default();
        r.install_program(&program()).unwrap();
        let before: Vec<_> = r.statics().iter().map(|(_, v)| v.clone()).collect();

        r.merge(vec![
            UniformVariable::new("time", UniformValue::Scalar(99.0)).permanent(true),
            UniformVariable::new("size", UniformValue::Vec2([1.0, 1.0])).permanent(true),
        ]);
        assert_eq!(r.overflow_len(), 0);

        for b in Builtin::ALL {
            assert_eq!(r.remove(&b.key()), RemoveOutcome::Builtin);
        }
        assert_eq!(r.remove(&key("time", Variant::Scalar)), RemoveOutcome::Builtin);
        assert!(!r.add(UniformVariable::with_default("mvp", Variant::Mat4)));

        let after: Vec<_> = r.statics().iter().map(|(_, v)| v.clone()).collect();
        assert_eq!(before, after);
        assert!(r.get(&key("time", Variant::Scalar)).is_some());
    }

    #[test]
    fn permanent_values_survive_a_shader_swap() {
        let mut r = Registry::default();
        r.install_program(&program()).unwrap();
        r.set_value(&key("gain", Variant::Scalar), &UniformValue::Scalar(0.3)).unwrap();
        assert!(r.set_permanent(&key("gain", Variant::Scalar), true));

        // Program without `gain`: parked.
        let b = FakeProgram::default().with("tint", glow::FLOAT_VEC3, 1);
        let rx = r.subscribe();
        r.install_program(&b).unwrap();
        assert!(r.get(&key("gain", Variant::Scalar)).is_none());
        assert_eq!(r.overflow_len(), 1);
        assert!(drain(&rx).contains(&RegistryEvent::Deleted {
            key: key("gain", Variant::Scalar)
        }));

        // Program with `gain` again: promoted with its value.
        r.install_program(&program()).unwrap();
        let gain = r.get(&key("gain", Variant::Scalar)).unwrap();
        assert_eq!(gain.value(), &UniformValue::Scalar(0.3));
        assert!(gain.permanent);
        assert_eq!(r.overflow_len(), 0);
    }

    #[test]
    fn non_permanent_values_are_discarded_on_swap() {
        let mut r = Registry::default();
        r.install_program(&program()).unwrap();
        r.set_value(&key("gain", Variant::Scalar), &UniformValue::Scalar(0.3)).unwrap();

        r.install_program(&FakeProgram::default()).unwrap();
        assert_eq!(r.overflow_len(), 0);
        r.install_program(&program()).unwrap();
        assert_eq!(
            r.get(&key("gain", Variant::Scalar)).unwrap().value(),
            &UniformValue::Scalar(0.0)
        );
    }

    #[test]
    fn recompile_keeps_edited_values() {
        let mut r = Registry::default();
        r.install_program(&program()).unwrap();
        r.set_value_text(&key("tint", Variant::Vec3), "1,0.5,0").unwrap();
        let rx = r.subscribe();
        r.install_program(&program()).unwrap();
        assert_eq!(
            r.get(&key("tint", Variant::Vec3)).unwrap().value(),
            &UniformValue::Vec3([1.0, 0.5, 0.0])
        );
        assert!(!drain(&rx).iter().any(|e| matches!(e, RegistryEvent::Added { .. })));
    }

    #[test]
    fn type_change_is_a_different_binding() {
        let mut r = Registry::default();
        r.install_program(&program()).unwrap();
        r.set_permanent(&key("gain", Variant::Scalar), true);
        let b = FakeProgram::default().with("gain", glow::FLOAT_VEC2, 1);
        r.install_program(&b).unwrap();
        assert_eq!(r.get(&key("gain", Variant::Vec2)).unwrap().value(), &UniformValue::Vec2([0.0, 0.0]));
        assert_eq!(r.overflow().next().unwrap().variant(), Variant::Scalar);
    }

    #[test]
    fn failed_load_changes_nothing() {
        let mut r = Registry::default();
        r.install_program(&program()).unwrap();
        r.merge(vec![UniformVariable::new("ghost", UniformValue::Scalar(1.0)).permanent(true)]);
        let rx = r.subscribe();

        let path = temp_vars("bad");
        std::fs::write(&path, "gain float 1 0.5\ntint float3 0 1,2\n").unwrap();
        assert!(!r.load(&path));
        assert!(r.load_from(&path).unwrap_err().is_parse());
        assert!(!r.load(&temp_vars("missing")));

        assert_eq!(r.get(&key("gain", Variant::Scalar)).unwrap().value(), &UniformValue::Scalar(0.0));
        assert_eq!(r.overflow_len(), 1);
        assert!(drain(&rx).is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_replaces_overflow() {
        let mut r = Registry::default();
        r.merge(vec![UniformVariable::new("old", UniformValue::Scalar(1.0)).permanent(true)]);
        let path = temp_vars("replace");
        std::fs::write(&path, "new float 1 2\n").unwrap();
        assert!(r.load(&path));
        let names: Vec<_> = r.overflow().map(|v| v.name().to_string()).collect();
        assert_eq!(names, ["new"]);
        assert!(r.discard_overflow(&key("new", Variant::Scalar)));
        assert!(!r.discard_overflow(&key("new", Variant::Scalar)));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn save_then_load_restores_values() {
        let path = temp_vars("roundtrip");
        let mut r = Registry::default();
        r.install_program(&program()).unwrap();
        r.set_value(&key("gain", Variant::Scalar), &UniformValue::Scalar(0.125)).unwrap();
        r.set_value_text(&key("albedo", Variant::Texture2D), "images/bark.png").unwrap();
        r.merge(vec![UniformVariable::new("ghost", UniformValue::Scalar(7.0)).permanent(true)]);
        // gain, tint, albedo, ghost; `time` is a built-in.
        assert_eq!(r.save_to(&path).unwrap(), 4);

        let mut fresh = Registry::default();
        fresh.install_program(&program()).unwrap();
        assert!(fresh.load(&path));
        assert_eq!(
            fresh.get(&key("gain", Variant::Scalar)).unwrap().value(),
            &UniformValue::Scalar(0.125)
        );
        assert_eq!(
            fresh.get(&key("albedo", Variant::Texture2D)).unwrap().value(),
            &UniformValue::texture_2d("images/bark.png")
        );
        assert_eq!(fresh.overflow_len(), 1);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn remove_and_add_emit_events() {
        let mut r = Registry::default();
        r.install_program(&program()).unwrap();
        let rx = r.subscribe();
        assert_eq!(r.remove(&key("gain", Variant::Scalar)), RemoveOutcome::Removed);
        assert_eq!(r.remove(&key("gain", Variant::Scalar)), RemoveOutcome::Unknown);
        assert!(r.add(UniformVariable::with_default("gain", Variant::Scalar)));
        assert!(!r.add(UniformVariable::with_default("gain", Variant::Scalar)));
        assert_eq!(
            drain(&rx),
            vec![
                RegistryEvent::Deleted { key: key("gain", Variant::Scalar) },
                RegistryEvent::Added { key: key("gain", Variant::Scalar) },
            ]
        );
    }

    #[test]
    fn add_promotes_a_parked_value() {
        let mut r = Registry::default();
        r.install_program(&program()).unwrap();
        r.merge(vec![UniformVariable::new("ghost", UniformValue::Scalar(0.9)).permanent(true)]);
        let rx = r.subscribe();

        assert!(r.add(UniformVariable::with_default("ghost", Variant::Scalar)));
        let ghost = r.get(&key("ghost", Variant::Scalar)).unwrap();
        assert_eq!(ghost.value(), &UniformValue::Scalar(0.9));
        assert!(ghost.permanent);
        assert_eq!(r.overflow_len(), 0);
        assert_eq!(
            drain(&rx),
            vec![
                RegistryEvent::ValueChanged {
                    key: key("ghost", Variant::Scalar),
                    value: "0.9".into()
                },
                RegistryEvent::Added { key: key("ghost", Variant::Scalar) },
            ]
        );
    }

    #[test]
    fn loaded_permanent_value_waits_for_its_binding() {
        let path = temp_vars("survive");
        std::fs::write(&path, "ghost float3 1 1,2,3\n").unwrap();

        let mut r = Registry::default();
        r.install_program(&program()).unwrap();
        assert!(r.load(&path));
        assert!(r.get(&key("ghost", Variant::Vec3)).is_none());
        let parked: Vec<_> = r.overflow().map(|v| v.key()).collect();
        assert_eq!(parked, [key("ghost", Variant::Vec3)]);

        r.install_program(&program().with("ghost", glow::FLOAT_VEC3, 1)).unwrap();
        let ghost = r.get(&key("ghost", Variant::Vec3)).unwrap();
        assert_eq!(ghost.value(), &UniformValue::Vec3([1.0, 2.0, 3.0]));
        assert!(ghost.permanent);
        assert_eq!(r.overflow_len(), 0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn save_counts_only_written_records() {
        let path = temp_vars("count");
        let mut r = Registry::default();
        assert!(r.add(UniformVariable::with_default("clock", Variant::Time)));
        assert!(r.add(UniformVariable::with_default("gain", Variant::Scalar)));
        assert_eq!(r.save_to(&path).unwrap(), 1);
        assert_eq!(codec::read_vars_file(&path).unwrap().len(), 1);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn reset_clock_restarts_time() {
        let mut r = Registry::default();
        r.clock = Instant::now() - std::time::Duration::from_secs(5);
        assert!(r.elapsed() >= 5.0);
        r.reset_clock();
        assert!(r.elapsed() < 5.0);
    }

    #[test]
    fn push_uploads_everything_with_sequential_units() {
        let mut r = Registry::default().with_first_texture_unit(3);
        let p = program().with("env", glow::SAMPLER_CUBE, 1);
        r.install_program(&p).unwrap();
        r.set_value_text(&key("albedo", Variant::Texture2D), "a.png").unwrap();
        r.set_value_text(&key("env", Variant::TextureCube), "1,2,3,4,5,6").unwrap();

        let mut t = RecordingTarget::default();
        r.push(&mut t);
        assert_eq!(t.scalars.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(), ["gain", "time"]);
        assert_eq!(t.vec3s.len(), 1);
        assert_eq!(
            t.samplers,
            vec![
                ("albedo".to_string(), SamplerKind::Texture2D, 3),
                ("env".to_string(), SamplerKind::Cube, 4),
            ]
        );

        // Textures load once.
        r.push(&mut t);
        assert_eq!(t.texture_loads, 2);
    }

    #[test]
    fn host_feeds_builtins() {
        let mut r = Registry::default();
        r.set_size(800.0, 600.0);
        r.set_mouse(10.0, 20.0, true);
        let mut rows = crate::value::IDENTITY4;
        rows[3] = 5.0;
        r.set_matrix(BuiltinMatrix::View, rows);

        let mut t = RecordingTarget::default();
        r.push_builtins(&[Builtin::Size, Builtin::Mouse, Builtin::View], &mut t);
        assert_eq!(t.vec2s, vec![("size".to_string(), [800.0, 600.0])]);
        assert_eq!(t.vec3s, vec![("mouse".to_string(), [10.0, 20.0, 1.0])]);
        // Uploaded column-major: the translation lands in the last column.
        assert_eq!(t.mat4s[0].1[12], 5.0);
        assert!(r.set_builtin(Builtin::Size, &UniformValue::Scalar(1.0)).is_err());
    }
}
