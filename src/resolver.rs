use regex::Regex;
use std::sync::LazyLock;
use tracing::info;

use crate::comment::{CommentBatch, CommentId, CommentRecord};
use crate::error::{Result, SorteioError};

// Demo data only. Nothing here talks to Instagram: the post id seeds a
// generator so the same link always yields the same comments.

static POST_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"instagram\.com/p/([^/?]+)").expect("static regex"),
        Regex::new(r"instagram\.com/reel/([^/?]+)").expect("static regex"),
        Regex::new(r"instagr\.am/p/([^/?]+)").expect("static regex"),
    ]
});

const USERNAMES: [&str; 20] = [
    "maria_silva", "joao.santos", "ana_oliveira", "carlos_pereira",
    "juliana.costa", "pedro_almeida", "fernanda.lima", "ricardo_souza",
    "camila.rodrigues", "lucas_ferreira", "amanda.martins", "bruno_carvalho",
    "leticia.gomes", "gustavo_santos", "beatriz.oliveira", "felipe_dias",
    "larissa.ribeiro", "thiago_silva", "natalia.machado", "leonardo_costa",
];

const COMMENT_TEXTS: [&str; 20] = [
    "Adorei! 😍", "Que legal! 👏", "Quero participar! 🙏", "Muito bom! ⭐",
    "Estou dentro! 🎯", "Me escolhe! 🍀", "Quero ganhar! 🎁", "Incrível! 🔥",
    "Muito interessante! 💯", "Top demais! 👌", "Participando! 🤞", "Amei o sorteio! ❤️",
    "Quero muito! 😊", "Sensacional! 🎉", "Vamos nessa! 💪", "Me inscrevi! ✅",
    "Torço para ganhar! 🍀", "Que massa! 🤩", "Espero ter sorte! 🎲", "Já estou participando! 🏆",
];

const MIN_COMMENTS: u64 = 20;
const COMMENT_SPREAD: u64 = 30;

/// Linear congruential generator with the classic 9301/49297/233280 constants.
#[derive(Debug, Clone)]
struct Lcg {
    state: u64,
}

impl Lcg {
    const MULTIPLIER: u64 = 9301;
    const INCREMENT: u64 = 49297;
    const MODULUS: u64 = 233280;

    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Advances and returns a value in `0..max`.
    fn below(&mut self, max: u64) -> u64 {
        self.state = (self.state * Self::MULTIPLIER + Self::INCREMENT) % Self::MODULUS;
        self.state * max / Self::MODULUS
    }
}

/// Pulls the post/reel id out of an Instagram link.
pub fn extract_post_id(url: &str) -> Option<&str> {
    POST_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn seed_for(post_id: &str) -> u64 {
    post_id.encode_utf16().map(u64::from).sum()
}

/// Generates the simulated comment list for a post link.
pub fn resolve_post(url: &str) -> Result<CommentBatch> {
    let url = url.trim();
    if url.is_empty() {
        return Err(SorteioError::parse("empty link"));
    }
    let post_id = extract_post_id(url)
        .ok_or_else(|| SorteioError::parse(format!("not an Instagram post or reel link: {url}")))?;

    let batch = simulated_comments(post_id);
    info!(post_id, count = batch.len(), "generated simulated comments (no network access)");
    Ok(batch)
}

fn simulated_comments(post_id: &str) -> CommentBatch {
    let mut lcg = Lcg::new(seed_for(post_id));
    let count = lcg.below(COMMENT_SPREAD) + MIN_COMMENTS;

    (0..count)
        .map(|i| {
            let username = USERNAMES[lcg.below(USERNAMES.len() as u64) as usize];
            let text = COMMENT_TEXTS[lcg.below(COMMENT_TEXTS.len() as u64) as usize];
            CommentRecord::new(CommentId::Index(i as i64), username, text)
        })
        .collect::<Vec<_>>()
        .into()
}
