use crate::data::cases::CaseRecord;
use chrono::NaiveDate;

pub const INFO_TITLE: &str = "Informações de Casos COVID-19";
pub const PLACEHOLDER: &str = "Nenhuma informação disponível.";

/// Group digits the pt-BR way: 1234567 -> "1.234.567"
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

fn confirmed_phrase(confirmed: u64) -> String {
    match confirmed {
        0 => "Nenhum caso confirmado.".to_string(),
        1 => "1 caso confirmado.".to_string(),
        n => format!("{} casos confirmados.", format_count(n)),
    }
}

fn deaths_phrase(deaths: u64) -> String {
    match deaths {
        0 => "Nenhuma morte.".to_string(),
        1 => "1 morte.".to_string(),
        n => format!("{} mortes.", format_count(n)),
    }
}

/// Case summary shown under the municipality name.
///
/// A municipality without a record reads as zero confirmed cases.
pub fn describe(record: Option<&CaseRecord>) -> String {
    let (confirmed, deaths) = record.map_or((0, 0), |r| (r.confirmed, r.deaths));
    if confirmed == 0 && deaths == 0 {
        return confirmed_phrase(0);
    }
    format!("{} {}", confirmed_phrase(confirmed), deaths_phrase(deaths))
}

/// "Atualizado em 10/05/2020"
pub fn updated_label(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| format!("Atualizado em {}", d.format("%d/%m/%Y")))
}
