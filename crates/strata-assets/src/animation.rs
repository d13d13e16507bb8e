//! Animation channel decoding.
//!
//! This is the step the animation cache lets a load skip. Its output format is
//! versioned by [`ANIMATION_DECODER_VERSION`]; bump it whenever the decoded
//! layout changes so stale cache entries are treated as misses.

use gltf::animation::util::ReadOutputs;
use gltf::animation::Property;
use strata_core::{AnimationChannel, AnimationClip, AnimationSet, Interpolation, TargetPath};
use tracing::debug;

use crate::error::AssetError;

pub const ANIMATION_DECODER_VERSION: u32 = 1;

fn target_path(property: Property) -> TargetPath {
    match property {
        Property::Translation => TargetPath::Translation,
        Property::Rotation => TargetPath::Rotation,
        Property::Scale => TargetPath::Scale,
        Property::MorphTargetWeights => TargetPath::Weights,
    }
}

fn interpolation(mode: gltf::animation::Interpolation) -> Interpolation {
    match mode {
        gltf::animation::Interpolation::Linear => Interpolation::Linear,
        gltf::animation::Interpolation::Step => Interpolation::Step,
        gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
    }
}

/// Decode every animation in `doc` against resolved buffer bytes.
///
/// `doc` must have passed validation; `buffers` are indexed like its buffers.
pub fn decode_animations(doc: &gltf::Document, buffers: &[&[u8]]) -> Result<AnimationSet, AssetError> {
    let mut clips = Vec::new();

    for animation in doc.animations() {
        let a = animation.index();
        let mut channels = Vec::new();
        let mut duration = 0.0f32;

        for channel in animation.channels() {
            let context = || format!("animation {} channel {}", a, channel.index());
            let sampler = channel.sampler();
            let path = target_path(channel.target().property());
            let interpolation = interpolation(sampler.interpolation());

            let reader = channel.reader(|buffer| buffers.get(buffer.index()).copied());
            // Accessors without a buffer view read as zeros.
            let times: Vec<f32> = match reader.read_inputs() {
                Some(inputs) => inputs.collect(),
                None => vec![0.0; sampler.input().count()],
            };
            let output_len = sampler.output().count() * sampler.output().dimensions().multiplicity();
            let values: Vec<f32> = match reader.read_outputs() {
                Some(ReadOutputs::Translations(v)) | Some(ReadOutputs::Scales(v)) => {
                    v.flatten().collect()
                }
                // Quantized rotations and weights are normalized integers.
                Some(ReadOutputs::Rotations(r)) => r.into_f32().flatten().collect(),
                Some(ReadOutputs::MorphTargetWeights(w)) => w.into_f32().collect(),
                None => vec![0.0; output_len],
            };

            let per_key = if interpolation == Interpolation::CubicSpline { 3 } else { 1 };
            let keys = times.len();
            let components = match path.fixed_components() {
                Some(n) => n,
                None if keys == 0 => 0,
                None => values.len() / (keys * per_key),
            };

            let expected = keys * per_key * components;
            if values.len() != expected || (components == 0 && keys > 0) {
                return Err(AssetError::Codec(
                    context(),
                    format!(
                        "{} keyframes need {} output values, found {}",
                        keys,
                        expected,
                        values.len()
                    ),
                ));
            }
            if times.windows(2).any(|w| w[1] < w[0]) {
                return Err(AssetError::Codec(context(), "keyframe times are not increasing".into()));
            }

            if let Some(&last) = times.last() {
                duration = duration.max(last);
            }

            channels.push(AnimationChannel {
                target_node: channel.target().node().index(),
                path,
                interpolation,
                times,
                values,
                components,
            });
        }

        debug!(
            "decoded animation '{}' with {} channels ({:.2}s)",
            animation.name().unwrap_or("unnamed"),
            channels.len(),
            duration
        );

        clips.push(AnimationClip {
            name: animation.name().map(str::to_owned),
            channels,
            duration,
        });
    }

    Ok(AnimationSet { clips })
}
