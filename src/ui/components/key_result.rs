/// Outcome of offering a key to a component.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyResult<T> {
  /// Consumed with nothing for the parent to do
  Handled,
  /// Consumed, and the parent has something to react to
  Event(T),
  /// Not consumed; the parent handles the key itself
  NotHandled,
}
