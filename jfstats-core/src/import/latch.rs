/// Tracks which Jellystats backup shape a stream turned out to be.
///
/// Once a `jf_*` wrapper section has been seen, later bare top-level objects
/// are not treated as sessions anymore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JellystatsLatch {
    #[default]
    Unknown,
    WrapperDetected,
    BareArray,
}

impl JellystatsLatch {
    pub fn observe_wrapper(&mut self) {
        *self = JellystatsLatch::WrapperDetected;
    }

    /// Whether a bare object at the top level should be imported as a session.
    pub fn accept_bare_object(&mut self) -> bool {
        match self {
            JellystatsLatch::WrapperDetected => false,
            JellystatsLatch::Unknown | JellystatsLatch::BareArray => {
                *self = JellystatsLatch::BareArray;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_objects_are_refused_after_a_wrapper() {
        let mut latch = JellystatsLatch::default();
        assert!(latch.accept_bare_object());
        assert_eq!(latch, JellystatsLatch::BareArray);

        latch.observe_wrapper();
        assert!(!latch.accept_bare_object());
        assert_eq!(latch, JellystatsLatch::WrapperDetected);
    }
}
