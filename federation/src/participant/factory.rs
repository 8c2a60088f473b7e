use super::{Participant, ParticipantId};

/// Creates participants on demand, it's the only way the coordinator reaches them.
pub trait ParticipantFactory: Send + Sync {
    /// Should create a fresh participant for a single call.
    ///
    /// # Arguments
    /// * `id` - The id of the participant to create.
    fn make(&self, id: ParticipantId) -> Box<dyn Participant>;
}

impl<F, P> ParticipantFactory for F
where
    F: Fn(ParticipantId) -> P + Send + Sync,
    P: Participant + 'static,
{
    fn make(&self, id: ParticipantId) -> Box<dyn Participant> {
        Box::new(self(id))
    }
}
