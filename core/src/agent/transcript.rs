pub const OBSERVATION_MARKER: &str = "\nObservation:";
pub const THOUGHT_MARKER: &str = "\nThought:";

/// One think-act-observe round: what the model wrote and what the tool returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub output: String,
    pub observation: String,
}

impl Step {
    pub fn new(output: impl Into<String>, observation: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            observation: observation.into(),
        }
    }

    /// The model output followed by the observation, ending on a fresh
    /// `Thought:` so the next completion continues from there.
    pub fn render(&self) -> String {
        format!(
            "{}{} {}{}",
            self.output, OBSERVATION_MARKER, self.observation, THOUGHT_MARKER
        )
    }
}

/// Append-only history of one run.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    steps: Vec<Step>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn render(&self) -> String {
        self.steps
            .iter()
            .map(Step::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
