use crate::catalog::Operation;

/// One statement of a segment placed on the segment's tick grid.
#[derive(Debug)]
struct Placement {
    start: usize,
    end: usize,
    starts: Vec<Operation>,
    stops: Vec<Operation>,
}

/// Slot scheduling for a run of consecutive operations and assignments.
///
/// Slot `s` is the instant after `s` ticks since the segment began. Operations that start
/// without an explicit offset begin where the previous operation ended.
#[derive(Debug, Default)]
pub(super) struct Timeline {
    placements: Vec<Placement>,
    cursor: usize,
    has_actuator: bool,
}

impl Timeline {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Places a timed operation lasting `length` ticks, starting at `start` or right after
    /// the previous one. Returns the slot it ends at, or `None` if that slot overflows.
    pub(super) fn place(
        &mut self,
        start: Option<usize>,
        length: usize,
        starts: Vec<Operation>,
        stops: Vec<Operation>,
    ) -> Option<usize> {
        let start = start.unwrap_or(self.cursor);
        let end = start.checked_add(length)?;
        self.cursor = end;
        self.has_actuator = true;
        self.placements.push(Placement {
            start,
            end,
            starts,
            stops,
        });
        Some(end)
    }

    /// Places an instantaneous CPU step where the previous operation ended.
    pub(super) fn place_instant(&mut self, operation: Operation) {
        self.placements.push(Placement {
            start: self.cursor,
            end: self.cursor,
            starts: vec![operation],
            stops: Vec::new(),
        });
    }

    pub(super) fn has_actuator(&self) -> bool {
        self.has_actuator
    }

    /// The last slot any placement reaches.
    pub(super) fn length(&self) -> usize {
        self.placements.iter().map(|p| p.end).max().unwrap_or(0)
    }

    /// The commands issued at every slot `0..=length`.
    ///
    /// Within a slot, stops of operations that began earlier come first, in statement
    /// order, followed by the starts of operations beginning there. A zero-length
    /// operation's stops immediately follow its starts.
    pub(super) fn into_slots(self) -> Vec<Vec<Operation>> {
        let slots = self.length() + 1;
        let mut stopping: Vec<Vec<Operation>> = vec![Vec::new(); slots];
        let mut starting: Vec<Vec<Operation>> = vec![Vec::new(); slots];
        for placement in self.placements {
            starting[placement.start].extend(placement.starts);
            if placement.end == placement.start {
                starting[placement.start].extend(placement.stops);
            } else {
                stopping[placement.end].extend(placement.stops);
            }
        }
        stopping
            .into_iter()
            .zip(starting)
            .map(|(mut stops, starts)| {
                stops.extend(starts);
                stops
            })
            .collect()
    }
}
