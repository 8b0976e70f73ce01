// Quick look at an uploaded source file: what it is, who issued it, how fresh it is.
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use std::sync::LazyLock;
use tokio::io::AsyncReadExt;
use tracing::warn;

/// Bytes sampled from the start of the file.
const SAMPLE_BYTES: u64 = 8192;

static PEP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bpep\b|\bpoliticamente exposto").expect("valid PEP pattern")
});
static SANCTIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ofac|sanction|sanções|conselho de segurança|united nations")
        .expect("valid sanctions pattern")
});
static FRAUD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)fraude|fraudulento|suspeito|lavagem").expect("valid fraud pattern")
});
static ESG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\besg\b|sustentabilidade|environmental|governance").expect("valid ESG pattern")
});
static RATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)rating|moody|fitch|s&p").expect("valid rating pattern"));
static SANCTIONS_MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)sanction|ofac|united nations|conselho de segurança|sanç")
        .expect("valid sanctions mention pattern")
});

static EU_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bUni[aã]o Europeia\b|\bEU\b|\bEuropean Union\b").expect("valid EU pattern")
});
static US_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bOFAC\b|\bUS Treasury\b|\bUnited States\b").expect("valid US pattern")
});
static UK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bUK HMT\b|\bHis Majesty").expect("valid UK pattern"));
static UN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bNa[cç][aã]es Unidas\b|\bUnited Nations\b|\bONU\b").expect("valid UN pattern")
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(20[0-4][0-9])[-/.](0[1-9]|1[0-2])[-/.]([0-2][0-9]|3[01])").expect("valid date pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InsightCategory {
    #[serde(rename = "PEP")]
    Pep,
    #[serde(rename = "Sanções")]
    Sanctions,
    #[serde(rename = "Fraude / AML")]
    FraudAml,
    #[serde(rename = "ESG")]
    Esg,
    #[serde(rename = "Crédito / Rating")]
    CreditRating,
    #[serde(rename = "Outros")]
    Other,
}

impl InsightCategory {
    pub fn label(&self) -> &'static str {
        match self {
            InsightCategory::Pep => "PEP",
            InsightCategory::Sanctions => "Sanções",
            InsightCategory::FraudAml => "Fraude / AML",
            InsightCategory::Esg => "ESG",
            InsightCategory::CreditRating => "Crédito / Rating",
            InsightCategory::Other => "Outros",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInsight {
    pub filename: String,
    pub tipo_detectado: String,
    pub categoria: InsightCategory,
    pub jurisdicao: String,
    pub freshness: String,
    pub linhas_estimadas: usize,
    pub recomendacao: String,
    pub resumo: String,
}

fn detect_type(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or_default().to_lowercase();
    match ext.as_str() {
        "csv" => "CSV/Tabela",
        "txt" => "Texto",
        "xlsx" => "Excel",
        "pdf" => "PDF",
        _ => "Desconhecido",
    }
}

fn detect_category(text: &str) -> InsightCategory {
    if PEP_RE.is_match(text) {
        InsightCategory::Pep
    } else if SANCTIONS_RE.is_match(text) {
        InsightCategory::Sanctions
    } else if FRAUD_RE.is_match(text) {
        InsightCategory::FraudAml
    } else if ESG_RE.is_match(text) {
        InsightCategory::Esg
    } else if RATING_RE.is_match(text) {
        InsightCategory::CreditRating
    } else {
        InsightCategory::Other
    }
}

fn detect_jurisdiction(text: &str) -> &'static str {
    if EU_RE.is_match(text) {
        "União Europeia"
    } else if US_RE.is_match(text) {
        "Estados Unidos / OFAC"
    } else if UK_RE.is_match(text) {
        "Reino Unido"
    } else if UN_RE.is_match(text) {
        "Nações Unidas"
    } else {
        "Desconhecida"
    }
}

fn detect_freshness(text: &str, current_year: i32) -> String {
    let latest = DATE_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1).and_then(|y| y.as_str().parse::<i32>().ok()))
        .max();

    match latest {
        None => "Sem data explícita. Verificar validade manual.".to_string(),
        Some(year) if year < current_year - 2 => {
            format!("Fonte potencialmente desatualizada (última referência {}).", year)
        }
        Some(year) if year < current_year => {
            format!("Fonte possivelmente válida mas não recente (última referência {}).", year)
        }
        Some(_) => "Fonte parece recente.".to_string(),
    }
}

fn recommended_usage(category: InsightCategory, mentions_sanctions: bool) -> &'static str {
    match category {
        InsightCategory::Sanctions => {
            "Uso obrigatório em due diligence e onboarding de clientes de alto impacto antes da emissão da apólice."
        }
        InsightCategory::Pep => {
            "Aplicar reforço de due diligence e aprovação de nível Compliance antes de aceitar."
        }
        InsightCategory::FraudAml => {
            "Consultar sempre em sinistros suspeitos e renovações com histórico crítico."
        }
        _ if mentions_sanctions => {
            "Existe referência a sanções, escalar para Compliance antes de decisão comercial."
        }
        InsightCategory::Esg => {
            "Usar apenas para scoring reputacional e reporte interno; não usar isoladamente para recusa."
        }
        _ => "Fonte de apoio. Não substitui verificação humana.",
    }
}

/// Classifies a text sample taken from `filename`.
pub fn analyze_text(filename: &str, sample: &str, current_year: i32) -> SourceInsight {
    let categoria = detect_category(sample);
    let jurisdicao = detect_jurisdiction(sample);
    let freshness = detect_freshness(sample, current_year);
    let linhas_estimadas = sample.matches('\n').count();
    let recomendacao = recommended_usage(categoria, SANCTIONS_MENTION_RE.is_match(sample));

    let resumo = format!(
        "Ficheiro '{}' interpretado. Categoria provável: {}. Fonte associada a: {}. \
         Integridade temporal: {} Linhas detectadas ~{}. Recomendação: {}",
        filename,
        categoria.label(),
        jurisdicao,
        freshness,
        linhas_estimadas,
        recomendacao
    );

    SourceInsight {
        filename: filename.to_string(),
        tipo_detectado: detect_type(filename).to_string(),
        categoria,
        jurisdicao: jurisdicao.to_string(),
        freshness,
        linhas_estimadas,
        recomendacao: recomendacao.to_string(),
        resumo,
    }
}

/// Samples the first 8 KiB of a file; an unreadable file is analysed as empty.
pub async fn analyze_file(path: &Path, current_year: i32) -> SourceInsight {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut raw = Vec::new();
    match tokio::fs::File::open(path).await {
        Ok(file) => {
            if let Err(e) = file.take(SAMPLE_BYTES).read_to_end(&mut raw).await {
                warn!("Failed to read {}: {}", path.display(), e);
                raw.clear();
            }
        }
        Err(e) => warn!("Failed to open {}: {}", path.display(), e),
    }

    analyze_text(&filename, &String::from_utf8_lossy(&raw), current_year)
}
