//! Knobs: named scalar parameters, optionally ranged, linked or oscillated.
//!
//! Knobs live in a [`KnobBank`] owned by the layer and are addressed by
//! [`KnobId`]. A link is a plain id reference resolved on every read; the
//! bank refuses any link that would close a cycle.

use elysium_types::{KnobData, KnobId, KnobValue};

use super::oscillator::Oscillator;
use crate::error::{EngineError, EngineResult};

/// Tolerance used when deciding how many whole steps fit in a range.
const STEP_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnobRange {
    minimum: f32,
    maximum: f32,
    stepping: f32,
}

impl KnobRange {
    pub fn new(minimum: f32, maximum: f32, stepping: f32) -> EngineResult<Self> {
        let valid = minimum.is_finite()
            && maximum.is_finite()
            && stepping.is_finite()
            && minimum <= maximum
            && stepping > 0.0;
        if valid {
            Ok(Self { minimum, maximum, stepping })
        } else {
            Err(EngineError::InvalidRange { minimum, maximum, stepping })
        }
    }

    /// Range for built-in knobs whose bounds are compile-time constants.
    pub(crate) const fn fixed(minimum: f32, maximum: f32, stepping: f32) -> Self {
        Self { minimum, maximum, stepping }
    }

    pub fn minimum(&self) -> f32 {
        self.minimum
    }

    pub fn maximum(&self) -> f32 {
        self.maximum
    }

    pub fn stepping(&self) -> f32 {
        self.stepping
    }

    /// Clamp into the range and snap to the nearest `minimum + k * stepping`.
    /// The top of the usable range is the last whole step at or below `maximum`.
    pub fn constrain(&self, value: f32) -> f32 {
        let steps = ((self.maximum - self.minimum) / self.stepping + STEP_EPSILON).floor();
        let value = if value.is_nan() { self.minimum } else { value };
        let k = ((value - self.minimum) / self.stepping).round().clamp(0.0, steps);
        self.minimum + k * self.stepping
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Knob {
    name: String,
    value: KnobValue,
    range: Option<KnobRange>,
    linked: Option<KnobId>,
    link_value: bool,
    oscillator: Option<Oscillator>,
}

impl Knob {
    pub(crate) fn float(name: &str, value: f32, range: KnobRange) -> Self {
        Self::ranged(name, KnobValue::Float(value), range)
    }

    pub(crate) fn integer(name: &str, value: i32, range: KnobRange) -> Self {
        Self::ranged(name, KnobValue::Integer(value), range)
    }

    pub(crate) fn boolean(name: &str, value: bool) -> Self {
        Self {
            name: name.to_string(),
            value: KnobValue::Boolean(value),
            range: None,
            linked: None,
            link_value: false,
            oscillator: None,
        }
    }

    fn ranged(name: &str, value: KnobValue, range: KnobRange) -> Self {
        let mut knob = Self {
            name: name.to_string(),
            value,
            range: Some(range),
            linked: None,
            link_value: false,
            oscillator: None,
        };
        knob.set(value);
        knob
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stored value, ignoring any link.
    pub fn stored(&self) -> KnobValue {
        self.value
    }

    pub fn range(&self) -> Option<KnobRange> {
        self.range
    }

    pub fn linked(&self) -> Option<KnobId> {
        self.linked
    }

    pub fn link_value(&self) -> bool {
        self.link_value
    }

    pub fn oscillator(&self) -> Option<&Oscillator> {
        self.oscillator.as_ref()
    }

    pub fn oscillator_mut(&mut self) -> Option<&mut Oscillator> {
        self.oscillator.as_mut()
    }

    pub fn set_oscillator(&mut self, oscillator: Option<Oscillator>) {
        self.oscillator = oscillator;
    }

    /// Assign a value, converting to this knob's kind and constraining it.
    pub fn set(&mut self, value: KnobValue) {
        self.value = self.coerce(value.to_f32());
    }

    pub fn set_f32(&mut self, value: f32) {
        self.value = self.coerce(value);
    }

    /// Update all three range fields together and re-constrain the value.
    pub fn set_range(&mut self, minimum: f32, maximum: f32, stepping: f32) -> EngineResult {
        if self.range.is_none() {
            return Err(EngineError::Malformed(format!("knob {} has no range", self.name)));
        }
        let range = KnobRange::new(minimum, maximum, stepping)?;
        self.range = Some(range);
        self.value = self.coerce(self.value.to_f32());
        Ok(())
    }

    /// Convert a raw number into this knob's kind, constrained to its range.
    fn coerce(&self, raw: f32) -> KnobValue {
        let constrained = match self.range {
            Some(range) => range.constrain(raw),
            None => raw,
        };
        match self.value {
            KnobValue::Float(_) => KnobValue::Float(constrained),
            KnobValue::Integer(_) => KnobValue::Integer(constrained.round() as i32),
            KnobValue::Boolean(_) => KnobValue::Boolean(constrained >= 0.5),
        }
    }

    /// Convert without constraining; used for values read through a link.
    fn convert(&self, value: KnobValue) -> KnobValue {
        match (self.value, value) {
            (KnobValue::Float(_), v) => KnobValue::Float(v.to_f32()),
            (KnobValue::Integer(_), KnobValue::Integer(v)) => KnobValue::Integer(v),
            (KnobValue::Integer(_), v) => KnobValue::Integer(v.to_f32().round() as i32),
            (KnobValue::Boolean(_), KnobValue::Boolean(v)) => KnobValue::Boolean(v),
            (KnobValue::Boolean(_), v) => KnobValue::Boolean(v.to_f32() >= 0.5),
        }
    }

    pub fn to_data(&self, linked_name: Option<String>) -> KnobData {
        KnobData {
            value: self.value,
            minimum: self.range.map(|r| r.minimum),
            maximum: self.range.map(|r| r.maximum),
            stepping: self.range.map(|r| r.stepping),
            linked: linked_name,
            link_value: self.link_value,
            oscillator: self.oscillator.as_ref().map(Oscillator::to_data),
        }
    }

    /// Apply saved values. Links are resolved by the layer, which knows
    /// knob names; this only records the `link_value` flag.
    pub fn apply_data(&mut self, data: &KnobData) -> EngineResult {
        if std::mem::discriminant(&self.value) != std::mem::discriminant(&data.value) {
            return Err(EngineError::Malformed(format!(
                "knob {} expects a {} value, got {}",
                self.name,
                self.value.kind_name(),
                data.value.kind_name()
            )));
        }
        let oscillator = data.oscillator.as_ref().map(Oscillator::from_data).transpose()?;
        if let (Some(_), Some(min), Some(max), Some(step)) =
            (self.range, data.minimum, data.maximum, data.stepping)
        {
            self.range = Some(KnobRange::new(min, max, step)?);
        }
        self.set(data.value);
        self.link_value = data.link_value;
        self.oscillator = oscillator;
        Ok(())
    }
}

/// Arena of knobs. Ids are never reused, so a stale id fails with
/// [`EngineError::MissingKnob`] instead of aliasing a newer knob.
#[derive(Debug, Clone, Default)]
pub struct KnobBank {
    slots: Vec<Option<Knob>>,
}

impl KnobBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, knob: Knob) -> KnobId {
        let id = KnobId::new(self.slots.len() as u32);
        self.slots.push(Some(knob));
        id
    }

    /// Remove a knob. Any knob linked to it loses its link.
    pub fn release(&mut self, id: KnobId) -> Option<Knob> {
        let knob = self.slots.get_mut(id.index())?.take()?;
        for other in self.slots.iter_mut().flatten() {
            if other.linked == Some(id) {
                log::debug!(target: "knob", "unlinking {} from released knob {}", other.name, id);
                other.linked = None;
                other.link_value = false;
            }
        }
        Some(knob)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: KnobId) -> bool {
        matches!(self.slots.get(id.index()), Some(Some(_)))
    }

    pub fn get(&self, id: KnobId) -> EngineResult<&Knob> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(EngineError::MissingKnob(id))
    }

    pub fn get_mut(&mut self, id: KnobId) -> EngineResult<&mut Knob> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(EngineError::MissingKnob(id))
    }

    /// Resolved value: follows the link chain while `link_value` is set.
    pub fn value(&self, id: KnobId) -> EngineResult<KnobValue> {
        let knob = self.get(id)?;
        let mut current = knob;
        let mut hops = 0;
        while let (Some(next), true) = (current.linked, current.link_value) {
            hops += 1;
            if hops > self.slots.len() {
                return Err(EngineError::LinkCycle { knob: id, target: next });
            }
            current = self.get(next)?;
        }
        Ok(knob.convert(current.value))
    }

    /// Resolved value plus the knob's own oscillator sampled at `t`,
    /// constrained to the knob's range.
    pub fn dynamic_value(&self, id: KnobId, t: f64) -> EngineResult<KnobValue> {
        let value = self.value(id)?;
        let knob = self.get(id)?;
        match knob.oscillator.as_ref().filter(|osc| osc.enabled()) {
            Some(osc) => Ok(knob.coerce(value.to_f32() + osc.sample(t))),
            None => Ok(value),
        }
    }

    pub fn dynamic_f32(&self, id: KnobId, t: f64) -> EngineResult<f32> {
        Ok(self.dynamic_value(id, t)?.to_f32())
    }

    pub fn dynamic_i32(&self, id: KnobId, t: f64) -> EngineResult<i32> {
        Ok(match self.dynamic_value(id, t)? {
            KnobValue::Integer(v) => v,
            other => other.to_f32().round() as i32,
        })
    }

    pub fn dynamic_bool(&self, id: KnobId, t: f64) -> EngineResult<bool> {
        Ok(match self.dynamic_value(id, t)? {
            KnobValue::Boolean(v) => v,
            other => other.to_f32() >= 0.5,
        })
    }

    pub fn set(&mut self, id: KnobId, value: KnobValue) -> EngineResult {
        self.get_mut(id)?.set(value);
        Ok(())
    }

    pub fn set_range(&mut self, id: KnobId, minimum: f32, maximum: f32, stepping: f32) -> EngineResult {
        self.get_mut(id)?.set_range(minimum, maximum, stepping)
    }

    /// Link `id` to `target`. Rejected if `target`'s chain already reaches `id`.
    pub fn link(&mut self, id: KnobId, target: KnobId, link_value: bool) -> EngineResult {
        self.get(id)?;
        let mut cursor = Some(target);
        let mut hops = 0;
        while let Some(current) = cursor {
            if current == id || hops > self.slots.len() {
                return Err(EngineError::LinkCycle { knob: id, target });
            }
            cursor = self.get(current)?.linked;
            hops += 1;
        }
        let knob = self.get_mut(id)?;
        knob.linked = Some(target);
        knob.link_value = link_value;
        Ok(())
    }

    pub fn unlink(&mut self, id: KnobId) -> EngineResult {
        let knob = self.get_mut(id)?;
        knob.linked = None;
        knob.link_value = false;
        Ok(())
    }

    pub fn set_link_value(&mut self, id: KnobId, link_value: bool) -> EngineResult {
        let knob = self.get_mut(id)?;
        knob.link_value = link_value && knob.linked.is_some();
        Ok(())
    }

    pub fn set_oscillator(&mut self, id: KnobId, oscillator: Option<Oscillator>) -> EngineResult {
        self.get_mut(id)?.set_oscillator(oscillator);
        Ok(())
    }
}
