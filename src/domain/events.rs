// Outbound side effects raised by the simulation systems.
//
// Systems never talk to the transport. They push events into whatever sink
// the caller hands them; the lobby drains the sink into its broadcast.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Explosion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub size: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Explosion(Explosion),
}

pub trait EventSink {
    fn emit(&mut self, event: SimEvent);

    fn explosion(&mut self, x: f32, y: f32, z: f32, size: f32) {
        self.emit(SimEvent::Explosion(Explosion { x, y, z, size }));
    }
}

impl EventSink for Vec<SimEvent> {
    fn emit(&mut self, event: SimEvent) {
        self.push(event);
    }
}
