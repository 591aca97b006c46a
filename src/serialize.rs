//! Implements [`Serialize`][serde::Serialize] for types whose serialized shape differs from their
//! layout.

use serde::Serialize;
use serde::ser::{SerializeSeq, SerializeStruct};

use crate::context::ContextNode;
use crate::interval_set::IntervalSet;

/// Serialized as the sequence of its intervals. The read-only flag is not part of the value.
impl Serialize for IntervalSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.intervals().len()))?;

        for interval in self.intervals() {
            seq.serialize_element(interval)?;
        }

        seq.end()
    }
}

struct Frame<'a>(ContextNode<'a>);

impl Serialize for Frame<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("Frame", 2)?;
        state.serialize_field("invoking_state", &self.0.invoking_state())?;
        state.serialize_field("rule_index", &self.0.rule_index())?;

        state.end()
    }
}

/// Serialized as the whole chain of frames, innermost first.
impl Serialize for ContextNode<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.depth()))?;

        for node in self.ancestors() {
            seq.serialize_element(&Frame(node))?;
        }

        seq.end()
    }
}
