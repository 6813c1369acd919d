use std::fmt;
use std::str::FromStr;

/// Brazilian federative unit, identified by its two-letter code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateCode {
    AC,
    AL,
    AP,
    AM,
    BA,
    CE,
    DF,
    ES,
    GO,
    MA,
    MT,
    MS,
    MG,
    PA,
    PB,
    PR,
    PE,
    PI,
    RJ,
    RN,
    RS,
    RO,
    RR,
    SC,
    SP,
    SE,
    TO,
}

impl StateCode {
    /// Selector order: alphabetical by full name.
    pub const ALL: [StateCode; 27] = [
        StateCode::AC,
        StateCode::AL,
        StateCode::AP,
        StateCode::AM,
        StateCode::BA,
        StateCode::CE,
        StateCode::DF,
        StateCode::ES,
        StateCode::GO,
        StateCode::MA,
        StateCode::MT,
        StateCode::MS,
        StateCode::MG,
        StateCode::PA,
        StateCode::PB,
        StateCode::PR,
        StateCode::PE,
        StateCode::PI,
        StateCode::RJ,
        StateCode::RN,
        StateCode::RS,
        StateCode::RO,
        StateCode::RR,
        StateCode::SC,
        StateCode::SP,
        StateCode::SE,
        StateCode::TO,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StateCode::AC => "AC",
            StateCode::AL => "AL",
            StateCode::AP => "AP",
            StateCode::AM => "AM",
            StateCode::BA => "BA",
            StateCode::CE => "CE",
            StateCode::DF => "DF",
            StateCode::ES => "ES",
            StateCode::GO => "GO",
            StateCode::MA => "MA",
            StateCode::MT => "MT",
            StateCode::MS => "MS",
            StateCode::MG => "MG",
            StateCode::PA => "PA",
            StateCode::PB => "PB",
            StateCode::PR => "PR",
            StateCode::PE => "PE",
            StateCode::PI => "PI",
            StateCode::RJ => "RJ",
            StateCode::RN => "RN",
            StateCode::RS => "RS",
            StateCode::RO => "RO",
            StateCode::RR => "RR",
            StateCode::SC => "SC",
            StateCode::SP => "SP",
            StateCode::SE => "SE",
            StateCode::TO => "TO",
        }
    }

    /// Path segment of the boundary asset (`go/map.json`)
    pub fn lowercase(self) -> String {
        self.as_str().to_ascii_lowercase()
    }

    pub fn name(self) -> &'static str {
        match self {
            StateCode::AC => "Acre",
            StateCode::AL => "Alagoas",
            StateCode::AP => "Amapá",
            StateCode::AM => "Amazonas",
            StateCode::BA => "Bahia",
            StateCode::CE => "Ceará",
            StateCode::DF => "Distrito Federal",
            StateCode::ES => "Espírito Santo",
            StateCode::GO => "Goiás",
            StateCode::MA => "Maranhão",
            StateCode::MT => "Mato Grosso",
            StateCode::MS => "Mato Grosso do Sul",
            StateCode::MG => "Minas Gerais",
            StateCode::PA => "Pará",
            StateCode::PB => "Paraíba",
            StateCode::PR => "Paraná",
            StateCode::PE => "Pernambuco",
            StateCode::PI => "Piauí",
            StateCode::RJ => "Rio de Janeiro",
            StateCode::RN => "Rio Grande do Norte",
            StateCode::RS => "Rio Grande do Sul",
            StateCode::RO => "Rondônia",
            StateCode::RR => "Roraima",
            StateCode::SC => "Santa Catarina",
            StateCode::SP => "São Paulo",
            StateCode::SE => "Sergipe",
            StateCode::TO => "Tocantins",
        }
    }

    /// Approximate (lat, lon) of the state, used to frame the map until
    /// its boundaries arrive.
    pub fn center(self) -> (f64, f64) {
        match self {
            StateCode::AC => (-9.0, -70.5),
            StateCode::AL => (-9.6, -36.6),
            StateCode::AP => (1.4, -51.8),
            StateCode::AM => (-4.2, -64.6),
            StateCode::BA => (-12.5, -41.7),
            StateCode::CE => (-5.2, -39.5),
            StateCode::DF => (-15.8, -47.9),
            StateCode::ES => (-19.6, -40.7),
            StateCode::GO => (-16.6, -49.2),
            StateCode::MA => (-5.0, -45.3),
            StateCode::MT => (-12.9, -55.9),
            StateCode::MS => (-20.5, -54.8),
            StateCode::MG => (-18.5, -44.6),
            StateCode::PA => (-3.8, -52.5),
            StateCode::PB => (-7.1, -36.8),
            StateCode::PR => (-24.6, -51.6),
            StateCode::PE => (-8.4, -37.9),
            StateCode::PI => (-7.7, -42.7),
            StateCode::RJ => (-22.2, -42.7),
            StateCode::RN => (-5.8, -36.6),
            StateCode::RS => (-29.8, -53.2),
            StateCode::RO => (-10.9, -62.8),
            StateCode::RR => (2.0, -61.4),
            StateCode::SC => (-27.3, -50.4),
            StateCode::SP => (-22.2, -48.7),
            StateCode::SE => (-10.6, -37.4),
            StateCode::TO => (-10.2, -48.3),
        }
    }

    /// Position in [`StateCode::ALL`]
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&s| s == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownState(pub String);

impl fmt::Display for UnknownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown state code {:?}", self.0)
    }
}

impl std::error::Error for UnknownState {}

impl FromStr for StateCode {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|code| code.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("go".parse::<StateCode>(), Ok(StateCode::GO));
        assert_eq!(" SP ".parse::<StateCode>(), Ok(StateCode::SP));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("XX".parse::<StateCode>().is_err());
        assert!("".parse::<StateCode>().is_err());
    }

    #[test]
    fn test_all_is_complete_and_unique() {
        let mut codes: Vec<&str> = StateCode::ALL.iter().map(|s| s.as_str()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 27);
    }

    #[test]
    fn test_next_prev_wrap() {
        assert_eq!(StateCode::TO.next(), StateCode::AC);
        assert_eq!(StateCode::AC.prev(), StateCode::TO);
        assert_eq!(StateCode::GO.next().prev(), StateCode::GO);
    }

    #[test]
    fn test_lowercase_path_segment() {
        assert_eq!(StateCode::GO.lowercase(), "go");
    }
}
