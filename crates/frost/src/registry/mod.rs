// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-node codec registry.
//!
//! Codecs are generated on first use and cached per Type ID. Each ID owns a
//! slot: readers load the codec without locking, and a per-slot mutex makes
//! concurrent first uses of one ID generate exactly once while different IDs
//! generate in parallel. Generating a codec first ensures its ancestor's
//! codec, taking the ancestor's slot lock while holding the child's.
//!
//! Lock order: slot mutex (child before ancestor), then class path, then the
//! local binding table. The class path lock is never held while an ancestor
//! codec is generated.

mod type_map;


use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

pub use type_map::{LocalTypeMap, TypeId, TypeIdService};

use crate::buffer::AutoBuffer;
use crate::class_path::{ClassPath, LoadContext, TASK};
use crate::codec::{Codec, CodecGenerator, CodecResolver};
use crate::config::WeaverConfig;
use crate::error::{WeaveError, WeaveResult};
use crate::model::{Instance, TypeDef};
use crate::overrides::MethodTable;

/// Which side of a reload this node plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Assigns the fresh Type ID.
    Leader,
    /// Adopts the binding the leader made for this version.
    Follower(TypeId),
}

/// Result of installing a definition on one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub type_id: TypeId,
    /// A prior definition was dropped.
    pub replaced: bool,
    /// Generation of the new load context.
    pub generation: u64,
}

/// Lifecycle of one type's codec on this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecState {
    /// The name has no Type ID on this node.
    Unbound,
    /// Bound, codec not generated yet.
    Unregistered(TypeId),
    Active(TypeId),
}

/// Cache hit/miss statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub hits: u64,
    pub misses: u64,
    pub generations: u64,
    pub invalidations: u64,
}

#[derive(Default)]
struct CodecSlot {
    codec: ArcSwapOption<Codec>,
    generating: Mutex<()>,
}

/// Node-local name ↔ id view.
#[derive(Debug, Default)]
struct Bindings {
    by_name: HashMap<String, TypeId>,
    by_id: HashMap<TypeId, String>,
}

impl Bindings {
    fn bind(&mut self, name: &str, id: TypeId) {
        self.by_name.insert(name.to_string(), id);
        self.by_id.insert(id, name.to_string());
    }

    fn unbind(&mut self, name: &str) -> Option<TypeId> {
        let id = self.by_name.remove(name)?;
        self.by_id.remove(&id);
        Some(id)
    }
}

pub struct TypeRegistry {
    config: WeaverConfig,
    class_path: RwLock<ClassPath>,
    ids: Arc<dyn TypeIdService>,
    bindings: RwLock<Bindings>,
    slots: DashMap<TypeId, Arc<CodecSlot>>,
    hits: AtomicU64,
    misses: AtomicU64,
    generations: AtomicU64,
    invalidations: AtomicU64,
}

impl TypeRegistry {
    pub fn new(config: WeaverConfig, ids: Arc<dyn TypeIdService>) -> WeaveResult<Self> {
        config.validate()?;
        Ok(Self {
            class_path: RwLock::new(ClassPath::new(&config.reserved_field)),
            config,
            ids,
            bindings: RwLock::new(Bindings::default()),
            slots: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            generations: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        })
    }

    /// Registry with its own in-process id service.
    pub fn standalone(config: WeaverConfig) -> WeaveResult<Self> {
        let ids = Arc::new(LocalTypeMap::new(config.first_type_id));
        Self::new(config, ids)
    }

    pub fn config(&self) -> &WeaverConfig {
        &self.config
    }

    pub fn id_service(&self) -> &Arc<dyn TypeIdService> {
        &self.ids
    }

    // ------------------------------------------------------------------
    // Definitions
    // ------------------------------------------------------------------

    /// Define a host type and bind its Type ID.
    pub fn define(&self, def: TypeDef) -> WeaveResult<TypeId> {
        let name = def.name.clone();
        self.class_path.write().define(def)?;
        self.type_id(&name)
    }

    /// Register native functions for custom overrides.
    pub fn with_natives<R>(&self, f: impl FnOnce(&mut MethodTable) -> R) -> R {
        f(self.class_path.write().natives_mut())
    }

    /// Read-only view of the class path.
    pub fn with_class_path<R>(&self, f: impl FnOnce(&ClassPath) -> R) -> R {
        f(&self.class_path.read())
    }

    pub fn definition(&self, name: &str) -> Option<Arc<TypeDef>> {
        self.class_path.read().get(name).cloned()
    }

    pub fn load_context(&self, name: &str) -> Option<LoadContext> {
        self.class_path.read().context(name).cloned()
    }

    /// Install a shipped definition, replacing any prior one.
    ///
    /// A prior definition's codec, the codecs of its descendants, its load
    /// context and its name binding are all dropped before the new
    /// definition is installed. The leader binds a fresh Type ID through the
    /// id service. A follower binds the ID the leader assigned, and fails
    /// with [`WeaveError::ReloadInconsistency`] unless the id service still
    /// maps `name` to it (a newer reload has superseded this one otherwise).
    pub fn install_definition(&self, name: &str, blob: Arc<[u8]>, role: Role) -> WeaveResult<InstallOutcome> {
        let def = TypeDef::from_blob(&blob)?;
        if def.name != name {
            return Err(WeaveError::Definition(format!(
                "blob defines `{}`, expected `{name}`",
                def.name
            )));
        }

        let mut cp = self.class_path.write();
        if cp.is_root(name) || name == TASK {
            return Err(WeaveError::Config(format!("built-in type `{name}` cannot be reloaded")));
        }
        cp.check_definition(&def)?;
        let adopted = match role {
            Role::Leader => None,
            Role::Follower(leader_id) => match self.ids.lookup(name) {
                Some(current) if current == leader_id => Some(leader_id),
                Some(current) => {
                    return Err(WeaveError::ReloadInconsistency(format!(
                        "`{name}` round for id {leader_id} is stale, the leader now binds id {current}"
                    )));
                }
                None => {
                    return Err(WeaveError::ReloadInconsistency(format!(
                        "no leader binding for `{name}` is visible on this node"
                    )));
                }
            },
        };

        let mut bindings = self.bindings.write();
        let replaced = cp.contains(name);
        if replaced {
            let dropped = self.drop_codecs(&cp, &bindings, name);
            bindings.unbind(name);
            cp.remove(name);
            log::debug!("[Registry] dropped {} ({} codecs)", name, dropped);
        }
        let context = cp.install_dynamic(def, blob)?;

        let type_id = match adopted {
            Some(id) => id,
            None => {
                self.ids.drop_name(name);
                self.ids.register(name)?
            }
        };
        bindings.bind(name, type_id);

        log::info!(
            "[Registry] {} {} as id {} (generation {}, {:?})",
            if replaced { "reloaded" } else { "loaded" },
            name,
            type_id,
            context.generation,
            role
        );
        Ok(InstallOutcome {
            type_id,
            replaced,
            generation: context.generation,
        })
    }

    /// Drop the cached codecs of `name`, of every type that extends it, and
    /// of every type holding a field of one of those (with its own
    /// subtypes). They are regenerated on next use.
    pub fn invalidate(&self, name: &str) -> usize {
        let cp = self.class_path.read();
        let bindings = self.bindings.read();
        self.drop_codecs(&cp, &bindings, name)
    }

    fn drop_codecs(&self, cp: &ClassPath, bindings: &Bindings, name: &str) -> usize {
        let mut affected: Vec<String> = std::iter::once(name.to_string())
            .chain(cp.descendants(name))
            .collect();
        // Field referrers cache the old category and enum constants.
        for referrer in cp.referrers(&affected) {
            affected.extend(cp.descendants(&referrer));
            affected.push(referrer);
        }
        affected.sort();
        affected.dedup();

        let mut dropped = 0;
        for n in &affected {
            let Some(id) = bindings.by_name.get(n) else {
                continue;
            };
            if let Some((_, slot)) = self.slots.remove(id) {
                if slot.codec.swap(None).is_some() {
                    dropped += 1;
                    self.invalidations.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        dropped
    }

    // ------------------------------------------------------------------
    // Type IDs
    // ------------------------------------------------------------------

    /// Type ID of `name`, binding it through the id service on first use.
    pub fn type_id(&self, name: &str) -> WeaveResult<TypeId> {
        if let Some(id) = self.bindings.read().by_name.get(name) {
            return Ok(*id);
        }
        let cp = self.class_path.read();
        if !cp.contains(name) {
            return Err(WeaveError::UnknownType(name.to_string()));
        }
        let id = self.ids.register(name)?;
        self.bindings.write().bind(name, id);
        Ok(id)
    }

    /// Name bound to `id` on this node.
    pub fn type_name(&self, id: TypeId) -> WeaveResult<String> {
        if let Some(name) = self.bindings.read().by_id.get(&id) {
            return Ok(name.clone());
        }
        let name = self
            .ids
            .name_of(id)
            .ok_or(WeaveError::UnknownTypeId(id.0))?;
        // Types this node knows but has not used yet are bound lazily; a
        // binding for a definition this node has not installed is refused.
        match self.type_id(&name) {
            Ok(local) if local == id => Ok(name),
            _ => Err(WeaveError::UnknownTypeId(id.0)),
        }
    }

    pub fn state(&self, name: &str) -> CodecState {
        let Some(id) = self.bindings.read().by_name.get(name).copied() else {
            return CodecState::Unbound;
        };
        if self.is_active(id) {
            CodecState::Active(id)
        } else {
            CodecState::Unregistered(id)
        }
    }

    pub fn is_active(&self, id: TypeId) -> bool {
        self.slots
            .get(&id)
            .is_some_and(|slot| slot.codec.load().is_some())
    }

    // ------------------------------------------------------------------
    // Codecs
    // ------------------------------------------------------------------

    /// Codec for `id`, generating it (and its ancestors) on first use.
    pub fn get_codec(&self, id: TypeId) -> WeaveResult<Arc<Codec>> {
        if id.is_null() {
            return Err(WeaveError::UnknownTypeId(id.0));
        }
        let slot = self.slots.entry(id).or_default().value().clone();

        if let Some(codec) = slot.codec.load_full() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(codec);
        }

        let _guard = slot.generating.lock();
        // Double-check: another thread may have generated while we waited
        if let Some(codec) = slot.codec.load_full() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(codec);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let codec = match self.generate(id) {
            Ok(codec) => Arc::new(codec),
            Err(e) => {
                // Unknown or broken ids must not leave empty slots behind.
                self.slots
                    .remove_if(&id, |_, s| Arc::ptr_eq(s, &slot) && s.codec.load().is_none());
                return Err(e);
            }
        };
        slot.codec.store(Some(Arc::clone(&codec)));
        self.generations.fetch_add(1, Ordering::Relaxed);
        log::debug!("[Registry] generated codec for {} (id {})", codec.type_name(), id);
        Ok(codec)
    }

    pub fn codec_for(&self, name: &str) -> WeaveResult<Arc<Codec>> {
        self.get_codec(self.type_id(name)?)
    }

    fn generate(&self, id: TypeId) -> WeaveResult<Codec> {
        let name = self.type_name(id)?;
        let parent_name = self
            .class_path
            .read()
            .serializable_parent(&name)
            .map(str::to_string);
        let parent = match parent_name {
            Some(parent) => Some(self.codec_for(&parent)?),
            None => None,
        };

        let cp = self.class_path.read();
        let still_bound = self.bindings.read().by_name.get(&name) == Some(&id);
        let same_parent = cp.serializable_parent(&name) == parent.as_ref().map(|p| p.type_name());
        if !still_bound || !same_parent {
            return Err(WeaveError::Definition(format!(
                "`{name}` was reloaded while its codec was being generated"
            )));
        }
        CodecGenerator::new(&cp, &self.config).generate(id, &name, parent)
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            generations: self.generations.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    // ------------------------------------------------------------------
    // Instances
    // ------------------------------------------------------------------

    pub fn new_instance(&self, name: &str) -> WeaveResult<Instance> {
        self.codec_for(name)?.new_instance()
    }

    /// Binary form of `inst`, without a type tag.
    pub fn encode(&self, inst: &Instance) -> WeaveResult<Vec<u8>> {
        let codec = self.codec_for(inst.type_name())?;
        let mut ab = AutoBuffer::new();
        codec.write(self, &mut ab, inst)?;
        Ok(ab.into_bytes())
    }

    /// Decode an untagged binary form of type `name`.
    pub fn decode(&self, name: &str, bytes: &[u8]) -> WeaveResult<Instance> {
        let codec = self.codec_for(name)?;
        let mut inst = codec.new_instance()?;
        let mut ab = AutoBuffer::from_bytes(bytes);
        codec.read(self, &mut ab, &mut inst)?;
        expect_consumed(&ab)?;
        Ok(inst)
    }

    /// Binary form prefixed with the Type ID.
    pub fn encode_tagged(&self, inst: &Instance) -> WeaveResult<Vec<u8>> {
        let codec = self.codec_for(inst.type_name())?;
        let mut ab = AutoBuffer::new();
        ab.put2(codec.type_id().0);
        codec.write(self, &mut ab, inst)?;
        Ok(ab.into_bytes())
    }

    pub fn decode_tagged(&self, bytes: &[u8]) -> WeaveResult<Instance> {
        let mut ab = AutoBuffer::from_bytes(bytes);
        let codec = self.get_codec(TypeId(ab.get2()?))?;
        let mut inst = codec.new_instance()?;
        codec.read(self, &mut ab, &mut inst)?;
        expect_consumed(&ab)?;
        Ok(inst)
    }

    pub fn encode_text(&self, inst: &Instance) -> WeaveResult<String> {
        let codec = self.codec_for(inst.type_name())?;
        let mut ab = AutoBuffer::new();
        codec.write_json(self, &mut ab, inst)?;
        String::from_utf8(ab.into_bytes())
            .map_err(|e| WeaveError::Encode(format!("text form is not UTF-8: {e}")))
    }

    pub fn decode_text(&self, name: &str, text: &str) -> WeaveResult<Instance> {
        let codec = self.codec_for(name)?;
        let mut inst = codec.new_instance()?;
        let mut ab = AutoBuffer::from_bytes(text.as_bytes());
        codec.read_json(self, &mut ab, &mut inst)?;
        if !ab.unread().iter().all(u8::is_ascii_whitespace) {
            return Err(WeaveError::Decode("trailing characters after text form".to_string()));
        }
        Ok(inst)
    }

    /// Copy every woven field of `src` into `dst` (task types only).
    pub fn copy_over(&self, dst: &mut Instance, src: &Instance) -> WeaveResult<()> {
        self.codec_for(dst.type_name())?.copy_over(dst, src)
    }
}

impl CodecResolver for TypeRegistry {
    fn codec_by_id(&self, id: TypeId) -> WeaveResult<Arc<Codec>> {
        self.get_codec(id)
    }

    fn codec_by_name(&self, name: &str) -> WeaveResult<Arc<Codec>> {
        self.codec_for(name)
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("bound", &self.bindings.read().by_name.len())
            .field("slots", &self.slots.len())
            .field("stats", &self.stats())
            .finish()
    }
}

fn expect_consumed(ab: &AutoBuffer) -> WeaveResult<()> {
    match ab.remaining() {
        0 => Ok(()),
        n => Err(WeaveError::Decode(format!(
            "{n} trailing bytes after offset {}",
            ab.position()
        ))),
    }
}
