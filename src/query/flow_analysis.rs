//! Pattern-based extraction of structural facts from retrieved code.
//!
//! This is deliberately approximate: regex families over the concatenated
//! chunk text, not a parser. The output grounds the flow-mode prompt in
//! names that actually appear in the code.

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::models::CodeChunk;

/// Extensions whose content carries no executable logic.
const NON_LOGIC_EXTENSIONS: &[&str] = &[
    "css", "scss", "sass", "less", "html", "htm", "svg", "json", "xml", "yml", "yaml", "lock",
    "md", "txt",
];

const MAX_CALL_SITE_CHARS: usize = 120;

static NAMED_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:function\*?|def|fn)\s+([A-Za-z_$][\w$]*)\s*[(<]").expect("valid regex")
});

static ARROW_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s*)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=>",
    )
    .expect("valid regex")
});

static INLINE_EVENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(on[A-Z][A-Za-z]*)\s*=\s*[{'\x22]").expect("valid regex"));

static EVENT_LISTENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"addEventListener\s*\(\s*['"`]([A-Za-z:-]+)['"`]"#).expect("valid regex")
});

static ROUTE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\b(?:app|router|server)\.(get|post|put|patch|delete|all|use)\s*\(\s*['"`]([^'"`]+)['"`]"#,
    )
    .expect("valid regex")
});

static ROUTE_HANDLER_EXPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bexport\s+(?:async\s+)?function\s+(GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\b")
        .expect("valid regex")
});

static API_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:fetch|axios\.(?:get|post|put|patch|delete|request))\s*\([^)\n]*\)?")
        .expect("valid regex")
});

static STATE_MUTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(set[A-Z]\w*|dispatch)\s*\(").expect("valid regex"));

static DOM_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bdocument\.(?:getElementById|getElementsBy\w+|querySelector(?:All)?|createElement)\s*\([^)\n]*\)?",
    )
    .expect("valid regex")
});

static DATA_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:prisma|db|supabase|firestore|mongoose|knex|sql|pool)\.[A-Za-z_][\w.]*\s*\(")
        .expect("valid regex")
});

/// Timer helpers look like React state setters but are not.
const NOT_STATE_SETTERS: &[&str] = &["setTimeout", "setInterval", "setImmediate"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowAnalysis {
    pub functions: Vec<String>,
    /// Normalized to `onEvent` form
    pub events: Vec<String>,
    /// `GET /path` for router registrations, `GET handler` for exported verb functions
    pub routes: Vec<String>,
    pub api_calls: Vec<String>,
    pub state_mutations: Vec<String>,
    pub dom_interactions: Vec<String>,
    pub data_calls: Vec<String>,
    /// No structure found and the text does not look like code at all
    pub empty: bool,
}

fn is_logic_file(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path).to_lowercase();
    match name.rsplit_once('.') {
        Some((_, ext)) => !NON_LOGIC_EXTENSIONS.contains(&ext),
        None => true,
    }
}

fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|i| seen.insert(i.clone())).collect()
}

fn clip(call: &str) -> String {
    let call = call.trim();
    match call.char_indices().nth(MAX_CALL_SITE_CHARS) {
        Some((idx, _)) => format!("{}...", &call[..idx]),
        None => call.to_string(),
    }
}

fn capture_all(re: &Regex, text: &str, group: usize) -> Vec<String> {
    re.captures_iter(text)
        .filter_map(|c| c.get(group).map(|m| m.as_str().to_string()))
        .collect()
}

fn match_all(re: &Regex, text: &str) -> Vec<String> {
    re.find_iter(text).map(|m| clip(m.as_str())).collect()
}

fn event_name(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => format!("on{}{}", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

pub fn analyze(chunks: &[CodeChunk]) -> FlowAnalysis {
    let text = chunks
        .iter()
        .filter(|c| is_logic_file(&c.file_path))
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let mut functions = capture_all(&NAMED_FUNCTION, &text, 1);
    functions.extend(capture_all(&ARROW_FUNCTION, &text, 1));

    let mut events = capture_all(&INLINE_EVENT, &text, 1);
    events.extend(
        capture_all(&EVENT_LISTENER, &text, 1)
            .iter()
            .map(|e| event_name(e)),
    );

    let mut routes: Vec<String> = ROUTE_CALL
        .captures_iter(&text)
        .map(|c| format!("{} {}", c[1].to_uppercase(), &c[2]))
        .collect();
    routes.extend(
        capture_all(&ROUTE_HANDLER_EXPORT, &text, 1)
            .into_iter()
            .map(|verb| format!("{verb} handler")),
    );

    let state_mutations = capture_all(&STATE_MUTATION, &text, 1)
        .into_iter()
        .filter(|name| !NOT_STATE_SETTERS.contains(&name.as_str()))
        .collect();

    let mut analysis = FlowAnalysis {
        functions: dedupe(functions),
        events: dedupe(events),
        routes: dedupe(routes),
        api_calls: dedupe(match_all(&API_CALL, &text)),
        state_mutations: dedupe(state_mutations),
        dom_interactions: dedupe(match_all(&DOM_QUERY, &text)),
        data_calls: dedupe(
            match_all(&DATA_CALL, &text)
                .into_iter()
                .map(|c| c.trim_end_matches('(').trim_end().to_string())
                .collect(),
        ),
        empty: false,
    };

    let no_structure = analysis.functions.is_empty()
        && analysis.events.is_empty()
        && analysis.routes.is_empty()
        && analysis.api_calls.is_empty()
        && analysis.state_mutations.is_empty()
        && analysis.dom_interactions.is_empty()
        && analysis.data_calls.is_empty();
    let looks_like_code =
        text.contains("import ") || text.contains("export ") || text.contains("class ");
    analysis.empty = no_structure && !looks_like_code;

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(path: &str, text: &str) -> CodeChunk {
        CodeChunk {
            id: path.to_string(),
            text: text.to_string(),
            file_path: path.to_string(),
            commit: None,
            embedding: None,
            score: None,
        }
    }

    const LOGIN_FORM: &str = r#"
function LoginForm() {
  const [user, setUser] = useState(null);
  const handleSubmit = async (e) => {
    const res = await fetch('/api/login', { method: 'POST' });
    setUser(await res.json());
    setTimeout(() => {}, 10);
  };
  return <form onSubmit={handleSubmit}><button onClick={reset}>Go</button></form>;
}
document.getElementById('root');
window.addEventListener('resize', onResize);
"#;

    #[test]
    fn test_extracts_frontend_structure() {
        let a = analyze(&[chunk("src/Login.tsx", LOGIN_FORM)]);
        assert_eq!(a.functions, vec!["LoginForm", "handleSubmit"]);
        assert_eq!(a.events, vec!["onSubmit", "onClick", "onResize"]);
        assert_eq!(a.api_calls.len(), 1);
        assert!(a.api_calls[0].starts_with("fetch('/api/login'"));
        assert_eq!(a.state_mutations, vec!["setUser"]);
        assert_eq!(a.dom_interactions, vec!["document.getElementById('root')"]);
        assert!(!a.empty);
    }

    #[test]
    fn test_extracts_backend_routes_and_data_calls() {
        let code = r#"
app.post('/users', createUser);
router.get("/users/:id", getUser);
export async function GET(req) {
  const users = await prisma.user.findMany();
  return Response.json(users);
}
"#;
        let a = analyze(&[chunk("server/routes.ts", code)]);
        assert_eq!(a.routes, vec!["POST /users", "GET /users/:id", "GET handler"]);
        assert_eq!(a.data_calls, vec!["prisma.user.findMany"]);
        assert!(a.functions.contains(&"GET".to_string()));
    }

    #[test]
    fn test_deduplicates() {
        let code = "setCount(1);\nsetCount(2);\ndispatch(a);\ndispatch(b);";
        let a = analyze(&[chunk("a.js", code)]);
        assert_eq!(a.state_mutations, vec!["setCount", "dispatch"]);
    }

    #[test]
    fn test_non_logic_files_ignored() {
        let a = analyze(&[
            chunk("styles/main.css", "function fake() {}"),
            chunk("package.json", "{\"scripts\": {}}"),
        ]);
        assert!(a.functions.is_empty());
        assert!(a.empty);
    }

    #[test]
    fn test_empty_requires_no_code_markers() {
        let a = analyze(&[chunk("src/types.ts", "export interface User { id: string }")]);
        assert!(a.functions.is_empty());
        assert!(!a.empty);

        let b = analyze(&[chunk("src/notes.ts", "just some words")]);
        assert!(b.empty);
    }

    #[test]
    fn test_no_chunks_is_empty() {
        assert!(analyze(&[]).empty);
    }
}
