use super::state::State;
use crate::core::lattice::Element;

/// Inspects the beam after each element during
/// [`Machine::propagate_observed`](super::machine::Machine::propagate_observed).
pub trait Observer {
    fn view(&mut self, element: &Element, state: &State);
}

impl<F> Observer for F
where
    F: FnMut(&Element, &State),
{
    fn view(&mut self, element: &Element, state: &State) {
        self(element, state)
    }
}

/// Records a copy of the state after every element.
#[derive(Debug, Default, Clone)]
pub struct Trace {
    pub entries: Vec<(usize, State)>,
}

impl Observer for Trace {
    fn view(&mut self, element: &Element, state: &State) {
        self.entries.push((element.index, state.clone()));
    }
}
