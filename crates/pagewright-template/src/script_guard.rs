//! Shields literal text from template expansion.
//!
//! A [`Guard`] swaps text the engine must not interpret for opaque tokens
//! and swaps the tokens back after expansion. Two kinds of text go in:
//! every `<script>…</script>` element of the composed page
//! ([`Guard::extract_scripts`]), and text that came from the remote site,
//! such as page chrome, `mainContent` and resolved query output
//! ([`Guard::seal`]). A token is plain ASCII with no engine delimiters and is
//! never a prefix of another token, so the round trip is lossless.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

use crate::directive::find_scripts;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// What a shielded literal is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shield {
    /// A `<script>` element of the composed page. Left untouched until
    /// restored.
    Script,
    /// Text from the remote site. Directive stages still rewrite it through
    /// [`Guard::rewrite_remote`]; only the engine never sees it.
    Remote,
}

/// One shielded literal: the token standing in for it and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardToken {
    /// The opaque placeholder.
    pub token: String,
    /// The original text.
    pub literal: String,
    /// Why it was shielded.
    pub shield: Shield,
}

/// The literals shielded during one render.
#[derive(Debug, Clone, Default)]
pub struct Guard {
    tokens: Vec<GuardToken>,
}

impl Guard {
    /// Creates an empty guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of shielded literals.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if nothing has been shielded.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The shielded literals, oldest first.
    pub fn tokens(&self) -> &[GuardToken] {
        &self.tokens
    }

    /// Shields remote `literal` and returns the token to put in its place.
    pub fn seal(&mut self, literal: &str) -> String {
        let token = self.fresh_token(literal);
        self.tokens.push(GuardToken {
            token: token.clone(),
            literal: literal.to_string(),
            shield: Shield::Remote,
        });
        token
    }

    /// Returns `true` if any remote literal satisfies `pred`.
    pub fn any_remote(&self, pred: impl Fn(&str) -> bool) -> bool {
        self.tokens
            .iter()
            .any(|t| t.shield == Shield::Remote && pred(&t.literal))
    }

    /// Rewrites every remote literal in place, oldest first.
    ///
    /// # Errors
    ///
    /// Stops at the first error `f` returns.
    pub fn rewrite_remote<E>(
        &mut self,
        mut f: impl FnMut(&str) -> Result<String, E>,
    ) -> Result<(), E> {
        for t in self.tokens.iter_mut().filter(|t| t.shield == Shield::Remote) {
            t.literal = f(&t.literal)?;
        }
        Ok(())
    }

    /// Replaces every script element in `text` with a fresh token.
    ///
    /// # Examples
    ///
    /// ```
    /// use pagewright_template::script_guard::Guard;
    ///
    /// let source = "<p>{{ a }}</p><script>if (x) { y(); }</script>";
    /// let mut guard = Guard::new();
    /// let stripped = guard.extract_scripts(source);
    /// assert!(!stripped.contains("<script>"));
    /// assert_eq!(guard.restore(&stripped), source);
    /// ```
    pub fn extract_scripts(&mut self, text: &str) -> String {
        let scripts = find_scripts(text);
        if scripts.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for range in &scripts {
            let token = self.fresh_token(text);
            out.push_str(&text[last..range.start]);
            out.push_str(&token);
            self.tokens.push(GuardToken {
                token,
                literal: text[range.clone()].to_string(),
                shield: Shield::Script,
            });
            last = range.end;
        }
        out.push_str(&text[last..]);

        tracing::debug!(count = scripts.len(), "scripts extracted");
        out
    }

    /// Puts every shielded literal back in place of its token.
    ///
    /// Newest tokens are restored first: a literal can only contain tokens
    /// issued before it, so those are exposed before their own turn comes.
    pub fn restore(&self, text: &str) -> String {
        let mut out = text.to_string();
        for t in self.tokens.iter().rev() {
            if out.contains(&t.token) {
                out = out.replace(&t.token, &t.literal);
            } else {
                tracing::debug!(token = %t.token, "guard token dropped during expansion");
            }
        }
        out
    }

    fn fresh_token(&self, text: &str) -> String {
        loop {
            let candidate = generate_token();
            if !text.contains(&candidate) && self.tokens.iter().all(|t| t.token != candidate) {
                return candidate;
            }
        }
    }
}

/// Time-based, random, and sequence-numbered so tokens are unique per render.
fn generate_token() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let salt: u64 = rand::thread_rng().gen();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("pw-guard-{millis:x}-{salt:016x}-{seq}-end")
}
