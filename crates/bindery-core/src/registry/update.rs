use crate::{
    binding::Binding,
    error::{ErrorClass, ErrorOrigin, InternalError},
    key::Key,
    obs::sink::{self, MetricsEvent},
    registry::{Registry, reject},
    value::Value,
};
use thiserror::Error as ThisError;

///
/// UpdateError
///
/// Rejections for batch-input element shapes. Batch application is
/// "prefix applied": elements before the failing one stay applied, the
/// failing element leaves no partial entry.
///

#[derive(Debug, ThisError)]
pub enum UpdateError {
    #[error("a set cannot supply fields: element order is undefined")]
    UnorderedFields,

    #[error("text and byte values iterate into characters, never fields")]
    TextAsFields,

    #[error("element is not an ordered field sequence: got {kind}")]
    NotFieldSequence { kind: &'static str },

    #[error("row has {found} fields, expected key plus {arity}")]
    RowArity { arity: usize, found: usize },

    #[error("value supplies {found} fields, expected {expected}")]
    FieldArity { expected: usize, found: usize },

    #[error("source registry arity {right} does not match arity {left}")]
    RegistryArityMismatch { left: usize, right: usize },
}

impl UpdateError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::UnorderedFields | Self::TextAsFields | Self::NotFieldSequence { .. } => {
                ErrorClass::KeyShape
            }
            Self::RowArity { .. } | Self::FieldArity { .. } => ErrorClass::Arity,
            Self::RegistryArityMismatch { .. } => ErrorClass::ArityMismatch,
        }
    }
}

impl From<UpdateError> for InternalError {
    fn from(err: UpdateError) -> Self {
        Self::new(err.class(), ErrorOrigin::Update, err.to_string())
    }
}

impl Registry {
    /// Copy every binding from a compatible registry. Present keys
    /// append in place without reordering; absent keys land at the end.
    pub fn update_from_registry(&mut self, other: &Self) -> Result<(), InternalError> {
        let left = self.schema().arity();
        let right = other.schema().arity();
        if left != right {
            return Err(reject(UpdateError::RegistryArityMismatch { left, right }));
        }

        let keys = other.len() as u64;
        for (key, bindings) in other.iter() {
            self.entries_mut()
                .entry(key.clone())
                .or_default()
                .extend_from_slice(bindings);
        }

        sink::emit(MetricsEvent::MergeApplied { keys });
        Ok(())
    }

    /// Apply a stream of row elements, each an ordered field sequence
    /// with the key first. Consumed lazily: each element validates
    /// before the next is pulled, so unbounded inputs fail on the
    /// offending element. Earlier valid elements stay applied.
    pub fn update_rows<I>(&mut self, rows: I) -> Result<(), InternalError>
    where
        I: IntoIterator<Item = Value>,
    {
        for row in rows {
            self.apply_row(row)?;
        }
        Ok(())
    }

    /// Apply one flat row: first field the key, remainder the binding.
    pub fn update_row(&mut self, fields: Vec<Value>) -> Result<(), InternalError> {
        let arity = self.schema().arity();
        if fields.len() != arity + 1 {
            return Err(reject(UpdateError::RowArity {
                arity,
                found: fields.len(),
            }));
        }

        let mut fields = fields.into_iter();
        let key = Key::try_from_value(fields.next().expect("length checked")).map_err(reject)?;
        self.insert_binding(key, Binding::new(fields.collect()))
    }

    /// Apply a key→value association. Each value unpacks to one or
    /// more bindings; see the element rules on [`UpdateError`].
    pub fn update_assoc<I>(&mut self, assoc: I) -> Result<(), InternalError>
    where
        I: IntoIterator<Item = (Key, Value)>,
    {
        for (key, value) in assoc {
            for binding in self.unpack_assoc_value(value)? {
                self.insert_binding(key.clone(), binding)?;
            }
        }
        Ok(())
    }

    fn apply_row(&mut self, row: Value) -> Result<(), InternalError> {
        match row {
            Value::List(fields) => self.update_row(fields),
            Value::Set(_) => Err(reject(UpdateError::UnorderedFields)),
            Value::Text(_) | Value::Bytes(_) => Err(reject(UpdateError::TextAsFields)),
            other => Err(reject(UpdateError::NotFieldSequence { kind: other.kind() })),
        }
    }

    /// Unpack an association value:
    /// - a list whose elements are all arity-length lists → multiple
    ///   bindings;
    /// - an arity-length list → one binding;
    /// - with arity 1, any scalar → the single-column binding.
    fn unpack_assoc_value(&self, value: Value) -> Result<Vec<Binding>, InternalError> {
        let arity = self.schema().arity();

        match value {
            Value::Set(_) => Err(reject(UpdateError::UnorderedFields)),

            Value::List(items) => {
                let all_rows = !items.is_empty()
                    && items
                        .iter()
                        .all(|item| matches!(item, Value::List(fields) if fields.len() == arity));

                if all_rows {
                    Ok(items
                        .into_iter()
                        .map(|item| {
                            let Value::List(fields) = item else {
                                unreachable!("all_rows checked every element")
                            };
                            Binding::new(fields)
                        })
                        .collect())
                } else if items.len() == arity {
                    Ok(vec![Binding::new(items)])
                } else {
                    Err(reject(UpdateError::FieldArity {
                        expected: arity,
                        found: items.len(),
                    }))
                }
            }

            Value::Text(_) | Value::Bytes(_) if arity > 1 => {
                Err(reject(UpdateError::TextAsFields))
            }

            scalar => {
                if arity == 1 {
                    Ok(vec![Binding::new(vec![scalar])])
                } else {
                    Err(reject(UpdateError::FieldArity {
                        expected: arity,
                        found: 1,
                    }))
                }
            }
        }
    }
}

///
/// TESTS
///
