//! The generic contract a trainer needs from an environment: reset, step,
//! and a discrete action space with optional masking.

pub trait Environment
where
    Self::State: Clone + Into<Vec<f32>>,
    Self::Action: Clone,
{
    type State;
    type Action;

    /// Starts a fresh episode and returns its initial state.
    fn reset(&mut self) -> Self::State;

    /// Applies one action and returns `(next_state, reward, done)`.
    fn step(&mut self, action: &Self::Action) -> (Self::State, f32, bool);

    /// One validity flag per action, in [`Environment::all_actions`] order.
    fn action_mask(&self) -> Vec<bool>;

    fn all_actions() -> Vec<Self::Action>;
    fn action_to_index(action: &Self::Action) -> usize;
}
