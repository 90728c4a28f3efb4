// Persona policy
//
// The fixed identity and behavioural constraints prepended to every context.
// One policy per process; it never changes after startup.

/// Identity, topic restriction and brevity rule for the assistant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaPolicy {
    /// Persona name the model answers as
    pub name: &'static str,

    /// Domain the assistant is restricted to
    pub domain: &'static str,

    /// Soft cap on answer length, in words
    pub max_answer_words: u32,
}

/// The dashboard's analytics assistant
pub const BIRDIE: PersonaPolicy = PersonaPolicy {
    name: "Birdie",
    domain: "disc golf",
    max_answer_words: 50,
};

impl PersonaPolicy {
    /// System preamble carrying identity, topic restriction and length rule.
    ///
    /// Every context starts with this text; on its own it is the persona-only
    /// fallback used before any player data has been supplied.
    pub fn preamble(&self) -> String {
        format!(
            "You are a {domain} analytics expert named '{name}'. \
             If questions and requests do not relate to {domain} player performance \
             and {domain} analytics, kindly apologize and decline to answer. \
             Be concise and answer a question in {words} words or less, if you can.",
            domain = self.domain,
            name = self.name,
            words = self.max_answer_words,
        )
    }
}

impl Default for PersonaPolicy {
    fn default() -> Self {
        BIRDIE
    }
}
