//! The shared per-frame snapshot and the field catalogue that drives it.
//!
//! Every numeric value in [`VisualEffectState`] is addressable through a
//! [`StateField`]. Clamping, continuity, interpolation, contribution merging
//! and style projection all walk that catalogue instead of naming fields one
//! by one.

use crate::constants::NEUTRAL_COLOR_TEMPERATURE;
use crate::device::DeviceCapabilityProfile;
use crate::quality::QualityLevel;
use glam::Vec2;
use smallvec::SmallVec;

/// Which subsystem owns a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldOrigin {
    Audio,
    Visual,
    Animation,
    Performance,
    Temporal,
}

impl FieldOrigin {
    /// Fields only producers and the coordinator may set.
    pub fn is_producer_only(self) -> bool {
        matches!(
            self,
            FieldOrigin::Audio | FieldOrigin::Performance | FieldOrigin::Temporal
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateField {
    Intensity,
    Energy,
    ColorTemperature,
    TempoModulation,
    Complexity,
    FlowX,
    FlowY,
    FluidIntensity,
    Depth,
    Luminosity,
    ColorHarmony,
    Coherence,
    PulseRate,
    TransitionFluidity,
    ScalingFactor,
    EffectDepth,
    SystemHarmony,
    AdaptiveQuality,
    ThermalPressure,
    BatteryConservation,
    EvolutionPhase,
    ContinuityIndex,
}

impl StateField {
    pub const ALL: [StateField; 22] = [
        StateField::Intensity,
        StateField::Energy,
        StateField::ColorTemperature,
        StateField::TempoModulation,
        StateField::Complexity,
        StateField::FlowX,
        StateField::FlowY,
        StateField::FluidIntensity,
        StateField::Depth,
        StateField::Luminosity,
        StateField::ColorHarmony,
        StateField::Coherence,
        StateField::PulseRate,
        StateField::TransitionFluidity,
        StateField::ScalingFactor,
        StateField::EffectDepth,
        StateField::SystemHarmony,
        StateField::AdaptiveQuality,
        StateField::ThermalPressure,
        StateField::BatteryConservation,
        StateField::EvolutionPhase,
        StateField::ContinuityIndex,
    ];

    /// Fields that ease between frames (audio, visual and animation groups).
    pub const SMOOTHED: [StateField; 17] = [
        StateField::Intensity,
        StateField::Energy,
        StateField::ColorTemperature,
        StateField::TempoModulation,
        StateField::Complexity,
        StateField::FlowX,
        StateField::FlowY,
        StateField::FluidIntensity,
        StateField::Depth,
        StateField::Luminosity,
        StateField::ColorHarmony,
        StateField::Coherence,
        StateField::PulseRate,
        StateField::TransitionFluidity,
        StateField::ScalingFactor,
        StateField::EffectDepth,
        StateField::SystemHarmony,
    ];

    /// Inclusive documented range.
    pub fn range(self) -> (f32, f32) {
        match self {
            StateField::ColorTemperature => (1000.0, 20000.0),
            StateField::TempoModulation
            | StateField::FluidIntensity
            | StateField::Luminosity => (0.0, 2.0),
            StateField::FlowX | StateField::FlowY => (-1.0, 1.0),
            StateField::PulseRate => (0.5, 4.0),
            StateField::ScalingFactor => (0.1, 2.0),
            _ => (0.0, 1.0),
        }
    }

    pub fn span(self) -> f32 {
        let (lo, hi) = self.range();
        hi - lo
    }

    /// Value used by a cold start.
    ///
    /// `AdaptiveQuality` is the exception once a coordinator exists: it is
    /// replaced by the scalar of the device's starting quality level.
    pub fn neutral(self) -> f32 {
        match self {
            StateField::Intensity
            | StateField::Energy
            | StateField::FlowX
            | StateField::FlowY
            | StateField::ThermalPressure
            | StateField::BatteryConservation
            | StateField::EvolutionPhase => 0.0,
            StateField::ColorTemperature => NEUTRAL_COLOR_TEMPERATURE,
            StateField::Complexity
            | StateField::Depth
            | StateField::ColorHarmony
            | StateField::TransitionFluidity
            | StateField::EffectDepth => 0.5,
            StateField::PulseRate => 2.0,
            // midpoint of full coherence and neutral color harmony
            StateField::SystemHarmony => 0.75,
            StateField::TempoModulation
            | StateField::FluidIntensity
            | StateField::Luminosity
            | StateField::ScalingFactor
            | StateField::Coherence
            | StateField::AdaptiveQuality
            | StateField::ContinuityIndex => 1.0,
        }
    }

    pub fn origin(self) -> FieldOrigin {
        match self {
            StateField::Intensity
            | StateField::Energy
            | StateField::ColorTemperature
            | StateField::TempoModulation
            | StateField::Complexity
            | StateField::FlowX
            | StateField::FlowY => FieldOrigin::Audio,
            StateField::FluidIntensity
            | StateField::Depth
            | StateField::Luminosity
            | StateField::ColorHarmony
            | StateField::Coherence => FieldOrigin::Visual,
            StateField::PulseRate
            | StateField::TransitionFluidity
            | StateField::ScalingFactor
            | StateField::EffectDepth
            | StateField::SystemHarmony => FieldOrigin::Animation,
            StateField::AdaptiveQuality
            | StateField::ThermalPressure
            | StateField::BatteryConservation => FieldOrigin::Performance,
            StateField::EvolutionPhase | StateField::ContinuityIndex => FieldOrigin::Temporal,
        }
    }

    pub fn is_producer_only(self) -> bool {
        self.origin().is_producer_only()
    }

    /// Style variable this field is projected to.
    pub fn css_name(self) -> &'static str {
        match self {
            StateField::Intensity => "--prism-intensity",
            StateField::Energy => "--prism-energy",
            StateField::ColorTemperature => "--prism-color-temperature",
            StateField::TempoModulation => "--prism-tempo-modulation",
            StateField::Complexity => "--prism-complexity",
            StateField::FlowX => "--prism-flow-x",
            StateField::FlowY => "--prism-flow-y",
            StateField::FluidIntensity => "--prism-fluid-intensity",
            StateField::Depth => "--prism-depth",
            StateField::Luminosity => "--prism-luminosity",
            StateField::ColorHarmony => "--prism-color-harmony",
            StateField::Coherence => "--prism-coherence",
            StateField::PulseRate => "--prism-pulse-rate",
            StateField::TransitionFluidity => "--prism-transition-fluidity",
            StateField::ScalingFactor => "--prism-scaling-factor",
            StateField::EffectDepth => "--prism-effect-depth",
            StateField::SystemHarmony => "--prism-system-harmony",
            StateField::AdaptiveQuality => "--prism-adaptive-quality",
            StateField::ThermalPressure => "--prism-thermal-pressure",
            StateField::BatteryConservation => "--prism-battery-conservation",
            StateField::EvolutionPhase => "--prism-evolution-phase",
            StateField::ContinuityIndex => "--prism-continuity",
        }
    }

    /// Clamp into range; non-finite input falls back to `fallback`.
    pub fn sanitize(self, value: f32, fallback: f32) -> f32 {
        let (lo, hi) = self.range();
        let v = if value.is_finite() { value } else { fallback };
        if v.is_finite() {
            v.clamp(lo, hi)
        } else {
            self.neutral()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioFields {
    pub intensity: f32,
    pub energy: f32,
    /// Kelvin-like, 1000..20000.
    pub color_temperature: f32,
    pub tempo_modulation: f32,
    pub complexity: f32,
    /// Each component in \[-1, 1\], length at most 1.
    pub flow_direction: Vec2,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualFields {
    pub fluid_intensity: f32,
    pub depth: f32,
    pub luminosity: f32,
    pub color_harmony: f32,
    pub coherence: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationFields {
    /// Seconds per pulse.
    pub pulse_rate: f32,
    pub transition_fluidity: f32,
    pub scaling_factor: f32,
    pub effect_depth: f32,
    pub system_harmony: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerformanceFields {
    pub device: DeviceCapabilityProfile,
    pub quality_level: QualityLevel,
    pub adaptive_quality: f32,
    pub thermal_pressure: f32,
    pub battery_conservation: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemporalFields {
    /// Milliseconds on the coordinator clock; strictly increasing per publish.
    pub timestamp_ms: f64,
    pub evolution_phase: f32,
    pub continuity_index: f32,
}

/// Everything renderers need for one frame. Participants only ever see a shared borrow.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualEffectState {
    pub audio: AudioFields,
    pub visual: VisualFields,
    pub animation: AnimationFields,
    pub performance: PerformanceFields,
    pub temporal: TemporalFields,
}

impl VisualEffectState {
    /// Neutral state for a cold start.
    pub fn neutral(
        device: DeviceCapabilityProfile,
        quality_level: QualityLevel,
        timestamp_ms: f64,
    ) -> Self {
        let n = StateField::neutral;
        Self {
            audio: AudioFields {
                intensity: n(StateField::Intensity),
                energy: n(StateField::Energy),
                color_temperature: n(StateField::ColorTemperature),
                tempo_modulation: n(StateField::TempoModulation),
                complexity: n(StateField::Complexity),
                flow_direction: Vec2::new(n(StateField::FlowX), n(StateField::FlowY)),
            },
            visual: VisualFields {
                fluid_intensity: n(StateField::FluidIntensity),
                depth: n(StateField::Depth),
                luminosity: n(StateField::Luminosity),
                color_harmony: n(StateField::ColorHarmony),
                coherence: n(StateField::Coherence),
            },
            animation: AnimationFields {
                pulse_rate: n(StateField::PulseRate),
                transition_fluidity: n(StateField::TransitionFluidity),
                scaling_factor: n(StateField::ScalingFactor),
                effect_depth: n(StateField::EffectDepth),
                system_harmony: n(StateField::SystemHarmony),
            },
            performance: PerformanceFields {
                device,
                quality_level,
                adaptive_quality: n(StateField::AdaptiveQuality),
                thermal_pressure: n(StateField::ThermalPressure),
                battery_conservation: n(StateField::BatteryConservation),
            },
            temporal: TemporalFields {
                timestamp_ms,
                evolution_phase: n(StateField::EvolutionPhase),
                continuity_index: n(StateField::ContinuityIndex),
            },
        }
    }

    pub fn get(&self, field: StateField) -> f32 {
        match field {
            StateField::Intensity => self.audio.intensity,
            StateField::Energy => self.audio.energy,
            StateField::ColorTemperature => self.audio.color_temperature,
            StateField::TempoModulation => self.audio.tempo_modulation,
            StateField::Complexity => self.audio.complexity,
            StateField::FlowX => self.audio.flow_direction.x,
            StateField::FlowY => self.audio.flow_direction.y,
            StateField::FluidIntensity => self.visual.fluid_intensity,
            StateField::Depth => self.visual.depth,
            StateField::Luminosity => self.visual.luminosity,
            StateField::ColorHarmony => self.visual.color_harmony,
            StateField::Coherence => self.visual.coherence,
            StateField::PulseRate => self.animation.pulse_rate,
            StateField::TransitionFluidity => self.animation.transition_fluidity,
            StateField::ScalingFactor => self.animation.scaling_factor,
            StateField::EffectDepth => self.animation.effect_depth,
            StateField::SystemHarmony => self.animation.system_harmony,
            StateField::AdaptiveQuality => self.performance.adaptive_quality,
            StateField::ThermalPressure => self.performance.thermal_pressure,
            StateField::BatteryConservation => self.performance.battery_conservation,
            StateField::EvolutionPhase => self.temporal.evolution_phase,
            StateField::ContinuityIndex => self.temporal.continuity_index,
        }
    }

    /// Set a field, clamped to its range. A non-finite value keeps the current one.
    pub fn set(&mut self, field: StateField, value: f32) {
        let value = field.sanitize(value, self.get(field));
        let slot = match field {
            StateField::Intensity => &mut self.audio.intensity,
            StateField::Energy => &mut self.audio.energy,
            StateField::ColorTemperature => &mut self.audio.color_temperature,
            StateField::TempoModulation => &mut self.audio.tempo_modulation,
            StateField::Complexity => &mut self.audio.complexity,
            StateField::FlowX => &mut self.audio.flow_direction.x,
            StateField::FlowY => &mut self.audio.flow_direction.y,
            StateField::FluidIntensity => &mut self.visual.fluid_intensity,
            StateField::Depth => &mut self.visual.depth,
            StateField::Luminosity => &mut self.visual.luminosity,
            StateField::ColorHarmony => &mut self.visual.color_harmony,
            StateField::Coherence => &mut self.visual.coherence,
            StateField::PulseRate => &mut self.animation.pulse_rate,
            StateField::TransitionFluidity => &mut self.animation.transition_fluidity,
            StateField::ScalingFactor => &mut self.animation.scaling_factor,
            StateField::EffectDepth => &mut self.animation.effect_depth,
            StateField::SystemHarmony => &mut self.animation.system_harmony,
            StateField::AdaptiveQuality => &mut self.performance.adaptive_quality,
            StateField::ThermalPressure => &mut self.performance.thermal_pressure,
            StateField::BatteryConservation => &mut self.performance.battery_conservation,
            StateField::EvolutionPhase => &mut self.temporal.evolution_phase,
            StateField::ContinuityIndex => &mut self.temporal.continuity_index,
        };
        *slot = value;
    }

    pub fn set_flow_direction(&mut self, flow: Vec2) {
        let flow = if flow.is_finite() {
            flow.clamp_length_max(1.0)
        } else {
            Vec2::ZERO
        };
        self.audio.flow_direction = flow;
    }

    /// Force every field back into range and replace NaNs.
    pub fn sanitize(&mut self) {
        for field in StateField::ALL {
            let v = self.get(field);
            self.set(field, field.sanitize(v, field.neutral()));
        }
        self.set_flow_direction(self.audio.flow_direction);
    }

    /// True when every bounded field is finite and in range.
    pub fn is_within_bounds(&self) -> bool {
        let fields_ok = StateField::ALL.iter().all(|f| {
            let (lo, hi) = f.range();
            let v = self.get(*f);
            v.is_finite() && v >= lo && v <= hi
        });
        fields_ok
            && self.audio.flow_direction.length() <= 1.0 + 1e-4
            && self.temporal.timestamp_ms.is_finite()
    }

    /// Pack the numeric state for a GPU uniform buffer.
    pub fn to_uniforms(&self) -> StateUniforms {
        StateUniforms {
            audio: [
                self.audio.intensity,
                self.audio.energy,
                self.audio.color_temperature,
                self.audio.tempo_modulation,
            ],
            flow_complexity: [
                self.audio.flow_direction.x,
                self.audio.flow_direction.y,
                self.audio.complexity,
                self.temporal.evolution_phase,
            ],
            visual: [
                self.visual.fluid_intensity,
                self.visual.depth,
                self.visual.luminosity,
                self.visual.color_harmony,
            ],
            animation: [
                self.animation.pulse_rate,
                self.animation.transition_fluidity,
                self.animation.scaling_factor,
                self.animation.effect_depth,
            ],
            performance: [
                self.performance.adaptive_quality,
                self.performance.thermal_pressure,
                self.performance.battery_conservation,
                self.visual.coherence,
            ],
        }
    }
}

/// Similarity between two states in \[0, 1\]; 1.0 means identical.
///
/// Depends only on the two arguments, so transitions replay identically.
pub fn continuity_index(previous: &VisualEffectState, current: &VisualEffectState) -> f32 {
    let total: f32 = StateField::SMOOTHED
        .iter()
        .map(|f| ((current.get(*f) - previous.get(*f)).abs() / f.span()).min(1.0))
        .sum();
    let mean = total / StateField::SMOOTHED.len() as f32;
    if mean.is_finite() {
        (1.0 - mean).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// std140-friendly block of `vec4<f32>` rows.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StateUniforms {
    pub audio: [f32; 4],
    pub flow_complexity: [f32; 4],
    pub visual: [f32; 4],
    pub animation: [f32; 4],
    pub performance: [f32; 4],
}

/// Partial state a participant offers each frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatePatch {
    entries: SmallVec<[(StateField, f32); 8]>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`StatePatch::set`].
    pub fn with(mut self, field: StateField, value: f32) -> Self {
        self.set(field, value);
        self
    }

    /// Insert or replace the value for `field`.
    pub fn set(&mut self, field: StateField, value: f32) {
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field, value)),
        }
    }

    pub fn get(&self, field: StateField) -> Option<f32> {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateField, f32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
