//! Poll readiness mask.

bitflags::bitflags! {
    /// Operations that can proceed without sleeping.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Readiness: u32 {
        /// Data is buffered (`POLLIN | POLLRDNORM`).
        const READABLE = 0b01;
        /// At least one byte of free space (`POLLOUT | POLLWRNORM`).
        const WRITABLE = 0b10;
    }
}

impl Readiness {
    /// Translate to the `poll(2)` event bits a multiplexer reports.
    pub fn to_poll_events(self) -> i16 {
        let mut events = 0;
        if self.contains(Readiness::READABLE) {
            events |= libc::POLLIN | libc::POLLRDNORM;
        }
        if self.contains(Readiness::WRITABLE) {
            events |= libc::POLLOUT | libc::POLLWRNORM;
        }
        events
    }
}
