//! Decoded animation data
//!
//! This is the payload the animation cache persists. Values are stored flat
//! (`components` floats per keyframe, or three times that for cubic splines)
//! so the whole set serializes compactly.

use serde::{Deserialize, Serialize};

/// Node property driven by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPath {
    Translation,
    Rotation,
    Scale,
    Weights,
}

impl TargetPath {
    /// Floats per keyframe for fixed-size paths; `None` for morph weights.
    pub fn fixed_components(self) -> Option<usize> {
        match self {
            TargetPath::Translation | TargetPath::Scale => Some(3),
            TargetPath::Rotation => Some(4),
            TargetPath::Weights => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
    CubicSpline,
}

/// One decoded channel: keyframe times and the values they drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationChannel {
    /// Index of the animated node.
    pub target_node: usize,
    pub path: TargetPath,
    pub interpolation: Interpolation,
    /// Keyframe times in seconds.
    pub times: Vec<f32>,
    /// Flat keyframe values. For cubic splines each keyframe holds
    /// in-tangent, value and out-tangent in that order.
    pub values: Vec<f32>,
    /// Floats per value element (3, 4, or the morph target count).
    pub components: usize,
}

impl AnimationChannel {
    pub fn keyframe_count(&self) -> usize {
        self.times.len()
    }
}

/// A named animation: a group of channels played together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: Option<String>,
    pub channels: Vec<AnimationChannel>,
    /// Largest keyframe time across all channels.
    pub duration: f32,
}

/// Every animation of one document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimationSet {
    pub clips: Vec<AnimationClip>,
}

impl AnimationSet {
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Total number of channels over all clips.
    pub fn channel_count(&self) -> usize {
        self.clips.iter().map(|c| c.channels.len()).sum()
    }

    pub fn clip_by_name(&self, name: &str) -> Option<&AnimationClip> {
        self.clips.iter().find(|c| c.name.as_deref() == Some(name))
    }
}
