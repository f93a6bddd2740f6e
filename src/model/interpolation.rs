use glam::{Quat, Vec3};
use itertools::Itertools;

/// A value pinned to a point in time, in clip ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
  pub time: f32,
  pub value: T,
}

impl<T> Keyframe<T> {
  pub fn new(time: f32, value: T) -> Self {
    Keyframe { time, value }
  }
}

/// Position or scale key.
pub type VectorKey = Keyframe<Vec3>;
/// Rotation key.
pub type QuatKey = Keyframe<Quat>;

///
/// Where a time falls inside a key array.
///
enum Bracket<'k, T> {
  /// Exactly one key applies.
  Key(&'k T),
  /// Blend `start` towards `end` by the factor, which is always in (0, 1].
  Between(&'k T, &'k T, f32),
}

///
/// Pick the pair of keys surrounding `time`.
///
/// The first pair whose second key is still ahead of `time` wins. Past the last key there is
/// no pair, and the last key is held. Before the first key the factor clamps to 0, so the
/// first key is held. Keys sharing a timestamp can't divide by zero, they also resolve to
/// the earlier key.
///
fn bracket<T>(time: f32, keys: &[Keyframe<T>]) -> Option<Bracket<'_, T>> {
  let last = keys.last()?;

  let pair = keys
    .iter()
    .tuple_windows::<(_, _)>()
    .find(|(_, next)| time < next.time);

  let Some((start, end)) = pair else {
    return Some(Bracket::Key(&last.value));
  };

  let span = end.time - start.time;
  let factor = if span > 0.0 {
    ((time - start.time) / span).clamp(0.0, 1.0)
  } else {
    0.0
  };

  if factor > 0.0 {
    Some(Bracket::Between(&start.value, &end.value, factor))
  } else {
    Some(Bracket::Key(&start.value))
  }
}

///
/// Linearly interpolate a position or scale track at `time`.
///
/// `time` must already be wrapped into the clip. An empty track yields zero.
///
pub fn interpolate_vector(time: f32, keys: &[VectorKey]) -> Vec3 {
  match bracket(time, keys) {
    Some(Bracket::Key(value)) => *value,
    Some(Bracket::Between(start, end, factor)) => *start + factor * (*end - *start),
    None => Vec3::ZERO,
  }
}

///
/// Spherically interpolate a rotation track at `time`.
///
/// Slerp keeps the blend on the shortest arc at constant angular speed, the result is
/// normalized again afterwards. An empty track yields the identity.
///
pub fn interpolate_quaternion(time: f32, keys: &[QuatKey]) -> Quat {
  match bracket(time, keys) {
    Some(Bracket::Key(value)) => *value,
    Some(Bracket::Between(start, end, factor)) => start.slerp(*end, factor).normalize(),
    None => Quat::IDENTITY,
  }
}

// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
// ?                            CODE ENDS HERE, BEGIN UNIT TESTS.                                   ? //
// ? ////////////////////////////////////////////////////////////////////////////////////////////// ? //
