use float_cmp::approx_eq;

use crate::animation::AnimationClip;

///
/// Tick rate used when a clip reports a ticks per second of 0.
///
pub const DEFAULT_TICKS_PER_SECOND: f32 = 25.0;

///
/// What to do with a sample time below zero.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegativeTimePolicy {
  /// Negative times sample the first frame.
  #[default]
  ClampToZero,
  /// Negative times wrap backwards through the clip.
  Wrap,
}

///
/// Memory layout of the flat float buffer handed to the shader.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UniformLayout {
  /// 16 floats per bone, column by column. This is what `glUniformMatrix4fv` expects
  /// with `transpose` set to false.
  #[default]
  ColumnMajor,
  /// 16 floats per bone, row by row.
  RowMajor,
}

///
/// Knobs for turning a clip and a wall clock time into a pose.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatorConfig {
  /// Fallback tick rate for clips that don't declare one.
  pub default_ticks_per_second: f32,
  /// Handling of negative sample times.
  pub negative_time: NegativeTimePolicy,
  /// Layout used by [`crate::Pose::to_uniform_data`].
  pub uniform_layout: UniformLayout,
}

impl Default for AnimatorConfig {
  fn default() -> Self {
    AnimatorConfig {
      default_ticks_per_second: DEFAULT_TICKS_PER_SECOND,
      negative_time: NegativeTimePolicy::default(),
      uniform_layout: UniformLayout::default(),
    }
  }
}

impl AnimatorConfig {
  ///
  /// Effective tick rate of a clip.
  ///
  pub fn ticks_per_second(&self, clip: &AnimationClip) -> f32 {
    let ticks_per_second = clip.ticks_per_second();
    if approx_eq!(f32, ticks_per_second, 0.0) {
      self.default_ticks_per_second
    } else {
      ticks_per_second
    }
  }

  ///
  /// Convert seconds into a clip local tick time, looping over the clip duration.
  ///
  pub fn sample_time(&self, clip: &AnimationClip, raw_time: f32) -> f32 {
    let duration = clip.duration();
    // A zero length clip only has one frame worth sampling.
    if !duration.is_finite() || duration <= 0.0 {
      return 0.0;
    }

    let raw_time = match self.negative_time {
      // f32::max also swallows NaN.
      NegativeTimePolicy::ClampToZero => raw_time.max(0.0),
      NegativeTimePolicy::Wrap => raw_time,
    };

    (raw_time * self.ticks_per_second(clip)).rem_euclid(duration)
  }
}

// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
// ?                            CODE ENDS HERE, BEGIN UNIT TESTS.                                   ? //
// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
