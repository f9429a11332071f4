use crate::{
    binding::Binding,
    error::{ErrorClass, ErrorOrigin, InternalError},
    key::Key,
    obs::sink::{self, MetricsEvent},
    registry::{ContainerError, Registry, reject},
};
use thiserror::Error as ThisError;

///
/// IndexDispatchError
///
/// Index shapes outside the five recognized forms.
///

#[derive(Debug, ThisError)]
pub enum IndexDispatchError {
    #[error("slice step must be non-zero")]
    ZeroStep,

    #[error("tuples cannot nest inside a tuple index")]
    NestedTuple,
}

impl From<IndexDispatchError> for InternalError {
    fn from(err: IndexDispatchError) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Index, err.to_string())
    }
}

///
/// SliceExpr
///
/// start/stop/step with the usual sequence-slice semantics, including
/// reverse iteration for a negative step. `None` selects the
/// direction-dependent boundary default.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SliceExpr {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: Option<isize>,
}

impl SliceExpr {
    #[must_use]
    pub const fn new(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
        Self { start, stop, step }
    }

    /// Covered ordinal positions for a container of `len` entries.
    pub(crate) fn positions(&self, len: usize) -> Result<Vec<usize>, InternalError> {
        let n = len as i64;
        let step = self.step.unwrap_or(1) as i64;
        if step == 0 {
            return Err(reject(IndexDispatchError::ZeroStep));
        }

        let (lower, upper) = if step > 0 { (0, n) } else { (-1, n - 1) };

        let clamp = |bound: isize| {
            let bound = bound as i64;
            if bound < 0 {
                (bound + n).max(lower)
            } else {
                bound.min(upper)
            }
        };

        let start = self
            .start
            .map_or(if step > 0 { lower } else { upper }, clamp);
        let stop = self
            .stop
            .map_or(if step > 0 { upper } else { lower }, clamp);

        let mut positions = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            positions.push(i as usize);
            i += step;
        }

        Ok(positions)
    }
}

///
/// IndexExpr
///
/// The five composite index forms. The reference resolved these by
/// runtime shape sniffing in precedence order; here the precedence is
/// the variant the caller constructs.
///

#[derive(Clone, Debug)]
pub enum IndexExpr {
    /// Bindings of one key.
    Key(Key),
    /// The key at an ordinal position (negative from the end).
    Position(isize),
    /// Ordered keys covered by start/stop/step.
    Slice(SliceExpr),
    /// Flattened bindings of every resolved element.
    Tuple(Vec<IndexExpr>),
    /// Every binding across every key.
    Wildcard,
}

impl IndexExpr {
    pub fn key(key: impl Into<Key>) -> Self {
        Self::Key(key.into())
    }

    #[must_use]
    pub const fn position(position: isize) -> Self {
        Self::Position(position)
    }

    #[must_use]
    pub const fn slice(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
        Self::Slice(SliceExpr::new(start, stop, step))
    }
}

///
/// Selection
///
/// What a composite index resolves to: bindings, one key, or an
/// ordered key list, depending on the index form.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Selection {
    Bindings(Vec<Binding>),
    Key(Key),
    Keys(Vec<Key>),
}

impl Selection {
    #[must_use]
    pub fn into_bindings(self) -> Option<Vec<Binding>> {
        match self {
            Self::Bindings(bindings) => Some(bindings),
            Self::Key(_) | Self::Keys(_) => None,
        }
    }

    #[must_use]
    pub fn into_key(self) -> Option<Key> {
        match self {
            Self::Key(key) => Some(key),
            Self::Bindings(_) | Self::Keys(_) => None,
        }
    }

    #[must_use]
    pub fn into_keys(self) -> Option<Vec<Key>> {
        match self {
            Self::Keys(keys) => Some(keys),
            Self::Bindings(_) | Self::Key(_) => None,
        }
    }
}

impl Registry {
    /// Resolve a composite index against the container.
    pub fn select(&self, expr: &IndexExpr) -> Result<Selection, InternalError> {
        match expr {
            IndexExpr::Key(key) => {
                let bindings = self
                    .get(key)
                    .ok_or_else(|| ContainerError::KeyNotFound { key: key.clone() })?;
                Ok(Selection::Bindings(bindings.to_vec()))
            }

            IndexExpr::Position(position) => Ok(Selection::Key(self.key_at(*position)?.clone())),

            IndexExpr::Tuple(elements) => {
                let keys = self.resolve_tuple_keys(elements)?;
                let mut bindings = Vec::new();
                for key in &keys {
                    bindings.extend_from_slice(self.get(key).expect("resolved key is present"));
                }
                Ok(Selection::Bindings(bindings))
            }

            IndexExpr::Slice(slice) => Ok(Selection::Keys(self.resolve_slice_keys(slice)?)),

            IndexExpr::Wildcard => {
                let mut bindings = Vec::new();
                for (_, entry) in self.iter() {
                    bindings.extend_from_slice(entry);
                }
                Ok(Selection::Bindings(bindings))
            }
        }
    }

    /// Merge everything the index resolves to into `dest`, removing
    /// vacated keys.
    ///
    /// - key form: rename; `dest` takes the source's slot when absent,
    ///   or absorbs its bindings when present;
    /// - position form: rename of the key at that slot, with `dest`
    ///   repositioned into it;
    /// - tuple/slice/wildcard forms: every resolved source key drains
    ///   into `dest` in resolution order.
    pub fn assign(&mut self, expr: &IndexExpr, dest: impl Into<Key>) -> Result<(), InternalError> {
        let dest = dest.into();

        match expr {
            IndexExpr::Key(key) => {
                if !self.contains_key(key) {
                    return Err(ContainerError::KeyNotFound { key: key.clone() }.into());
                }
                self.rename_into(key.clone(), dest, None)
            }

            IndexExpr::Position(position) => {
                let slot = self.normalize_position(*position)?;
                let source = self.key_at(*position)?.clone();
                self.rename_into(source, dest, Some(slot))
            }

            IndexExpr::Tuple(elements) => {
                let sources = self.resolve_tuple_keys(elements)?;
                self.drain_into(sources, dest);
                Ok(())
            }

            IndexExpr::Slice(slice) => {
                let sources = self.resolve_slice_keys(slice)?;
                self.drain_into(sources, dest);
                Ok(())
            }

            IndexExpr::Wildcard => {
                let sources: Vec<Key> = self.keys().cloned().collect();
                self.drain_into(sources, dest);
                Ok(())
            }
        }
    }

    /// Delete everything the index resolves to. Tuple elements naming
    /// absent keys are silently skipped, as in `select`.
    pub fn delete(&mut self, expr: &IndexExpr) -> Result<(), InternalError> {
        match expr {
            IndexExpr::Key(key) => {
                self.remove_key(key)?;
                Ok(())
            }

            IndexExpr::Position(position) => {
                let key = self.key_at(*position)?.clone();
                self.remove_key(&key)?;
                Ok(())
            }

            IndexExpr::Tuple(elements) => {
                for key in self.resolve_tuple_keys(elements)? {
                    self.remove_key(&key)?;
                }
                Ok(())
            }

            IndexExpr::Slice(slice) => {
                for key in self.resolve_slice_keys(slice)? {
                    self.remove_key(&key)?;
                }
                Ok(())
            }

            IndexExpr::Wildcard => {
                self.clear();
                Ok(())
            }
        }
    }

    /// Resolve tuple elements to present keys: first occurrence wins,
    /// absent keys are skipped silently, positional elements must be
    /// in range, tuples cannot nest.
    fn resolve_tuple_keys(&self, elements: &[IndexExpr]) -> Result<Vec<Key>, InternalError> {
        fn push_unique(keys: &mut Vec<Key>, key: Key) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        let mut keys: Vec<Key> = Vec::new();
        for element in elements {
            match element {
                IndexExpr::Key(key) => {
                    if self.contains_key(key) {
                        push_unique(&mut keys, key.clone());
                    }
                }
                IndexExpr::Position(position) => {
                    push_unique(&mut keys, self.key_at(*position)?.clone());
                }
                IndexExpr::Slice(slice) => {
                    for key in self.resolve_slice_keys(slice)? {
                        push_unique(&mut keys, key);
                    }
                }
                IndexExpr::Wildcard => {
                    for key in self.keys() {
                        push_unique(&mut keys, key.clone());
                    }
                }
                IndexExpr::Tuple(_) => {
                    return Err(reject(IndexDispatchError::NestedTuple));
                }
            }
        }

        Ok(keys)
    }

    fn resolve_slice_keys(&self, slice: &SliceExpr) -> Result<Vec<Key>, InternalError> {
        let positions = slice.positions(self.len())?;
        Ok(positions
            .into_iter()
            .map(|position| {
                let (key, _) = self
                    .entries()
                    .get_index(position)
                    .expect("slice position is in range");
                key.clone()
            })
            .collect())
    }

    /// Rename `source` to `dest`, merging bindings when `dest` already
    /// exists. `slot`, when given, is where `dest` must end up.
    fn rename_into(
        &mut self,
        source: Key,
        dest: Key,
        slot: Option<usize>,
    ) -> Result<(), InternalError> {
        if source == dest {
            return Ok(());
        }

        let source_index = self
            .entries()
            .get_index_of(&source)
            .expect("caller checked the source exists");
        let bindings = self
            .entries_mut()
            .shift_remove(&source)
            .expect("source entry exists");

        // A pre-existing destination only repositions on the explicit
        // positional form; a fresh one takes the vacated slot.
        let target_slot = if self.contains_key(&dest) {
            self.entries_mut()
                .get_mut(&dest)
                .expect("dest entry exists")
                .extend(bindings);
            slot
        } else {
            self.entries_mut().insert(dest.clone(), bindings);
            Some(slot.unwrap_or(source_index))
        };

        if let Some(target_slot) = target_slot {
            let len = self.len();
            let from = self
                .entries()
                .get_index_of(&dest)
                .expect("dest entry exists");
            self.entries_mut().move_index(from, target_slot.min(len - 1));
        }

        sink::emit(MetricsEvent::MergeApplied { keys: 1 });
        Ok(())
    }

    /// Append every source key's bindings to `dest` in order, removing
    /// the vacated sources. A no-op when no sources resolve.
    fn drain_into(&mut self, sources: Vec<Key>, dest: Key) {
        let sources: Vec<Key> = sources.into_iter().filter(|key| *key != dest).collect();
        if sources.is_empty() {
            return;
        }

        let moved = sources.len() as u64;
        for source in sources {
            let bindings = self
                .entries_mut()
                .shift_remove(&source)
                .expect("resolved source is present");
            self.entries_mut().entry(dest.clone()).or_default().extend(bindings);
        }

        sink::emit(MetricsEvent::MergeApplied { keys: moved });
    }
}

///
/// TESTS
///
