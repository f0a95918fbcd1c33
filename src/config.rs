//! Launch-time configuration. Not persisted — spec.md's Non-goals rule out
//! persistent configuration; these are compile/launch-time constants per
//! spec.md §6, gathered into one struct for `main` to thread through.

/// Parameters fixed for the lifetime of a running instance.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub led_count: usize,
    pub control_port: u16,
    pub audio_port: u16,
    pub max_clients: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            led_count: 50,
            control_port: 65432,
            audio_port: 5005,
            max_clients: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_original_deployment() {
        let cfg = Config::default();
        assert_eq!(cfg.led_count, 50);
        assert_eq!(cfg.control_port, 65432);
        assert_eq!(cfg.audio_port, 5005);
        assert_eq!(cfg.max_clients, 100);
    }
}
