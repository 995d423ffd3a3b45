/// A block of clocked logic advanced once per global clock cycle.
///
/// `tick` consumes the inputs present during the cycle and returns the
/// registered outputs after the clock edge. Everything a block computes in a
/// tick derives from state written in earlier ticks plus the current inputs.
pub trait Synchronous {
    type Input;
    type Output;

    /// Returns every register to its power-on value.
    fn reset(&mut self);

    fn tick(&mut self, input: Self::Input) -> Self::Output;
}

/// Compares a signal with its value from the previous tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeDetector {
    initial: bool,
    last: bool,
}

impl EdgeDetector {
    pub fn new(initial: bool) -> Self {
        Self {
            initial,
            last: initial,
        }
    }

    pub fn reset(&mut self) {
        self.last = self.initial;
    }

    /// Records `level` and reports whether it went low to high.
    pub fn rising(&mut self, level: bool) -> bool {
        let edge = level && !self.last;
        self.last = level;
        edge
    }

    /// Records `level` and reports whether it went high to low.
    pub fn falling(&mut self, level: bool) -> bool {
        let edge = !level && self.last;
        self.last = level;
        edge
    }
}

#[cfg(test)]
mod tests {
    use super::EdgeDetector;

    #[test]
    fn detects_each_edge_once() {
        let mut edge = EdgeDetector::new(false);
        let levels = [false, true, true, false, true];
        let rising: Vec<bool> = levels.iter().map(|&level| edge.rising(level)).collect();
        assert_eq!(rising, [false, true, false, false, true]);

        let mut edge = EdgeDetector::new(true);
        let falling: Vec<bool> = levels.iter().map(|&level| edge.falling(level)).collect();
        assert_eq!(falling, [true, false, false, true, false]);

        edge.reset();
        assert!(!edge.falling(true));
    }
}
