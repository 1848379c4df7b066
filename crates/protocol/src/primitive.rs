//! Primitive und Request-Status des Floor-Control-Protokolls
//!
//! Die numerischen Werte entsprechen dem Primitive-Feld im gemeinsamen
//! Header (BFCP). Unbekannte Werte bleiben als `Unbekannt` erhalten, damit der
//! Dispatcher sie protokollieren kann statt die Nachricht zu verwerfen.

use serde::{Deserialize, Serialize};

/// Typ-Tag einer dekodierten Protokoll-Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Primitive {
    FloorRequest,
    FloorRelease,
    FloorRequestQuery,
    FloorRequestStatus,
    UserQuery,
    UserStatus,
    FloorQuery,
    FloorStatus,
    ChairAction,
    ChairActionAck,
    Hello,
    HelloAck,
    Error,
    FloorRequestStatusAck,
    FloorStatusAck,
    Goodbye,
    GoodbyeAck,
    /// Wert ausserhalb des bekannten Bereichs
    Unbekannt(u8),
}

impl Primitive {
    /// Numerischer Wert im Header
    pub fn code(&self) -> u8 {
        match self {
            Self::FloorRequest => 1,
            Self::FloorRelease => 2,
            Self::FloorRequestQuery => 3,
            Self::FloorRequestStatus => 4,
            Self::UserQuery => 5,
            Self::UserStatus => 6,
            Self::FloorQuery => 7,
            Self::FloorStatus => 8,
            Self::ChairAction => 9,
            Self::ChairActionAck => 10,
            Self::Hello => 11,
            Self::HelloAck => 12,
            Self::Error => 13,
            Self::FloorRequestStatusAck => 14,
            Self::FloorStatusAck => 15,
            Self::Goodbye => 16,
            Self::GoodbyeAck => 17,
            Self::Unbekannt(code) => *code,
        }
    }

    /// Name fuer Logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::FloorRequest => "FloorRequest",
            Self::FloorRelease => "FloorRelease",
            Self::FloorRequestQuery => "FloorRequestQuery",
            Self::FloorRequestStatus => "FloorRequestStatus",
            Self::UserQuery => "UserQuery",
            Self::UserStatus => "UserStatus",
            Self::FloorQuery => "FloorQuery",
            Self::FloorStatus => "FloorStatus",
            Self::ChairAction => "ChairAction",
            Self::ChairActionAck => "ChairActionAck",
            Self::Hello => "Hello",
            Self::HelloAck => "HelloAck",
            Self::Error => "Error",
            Self::FloorRequestStatusAck => "FloorRequestStatusAck",
            Self::FloorStatusAck => "FloorStatusAck",
            Self::Goodbye => "Goodbye",
            Self::GoodbyeAck => "GoodbyeAck",
            Self::Unbekannt(_) => "Unbekannt",
        }
    }
}

impl From<u8> for Primitive {
    fn from(code: u8) -> Self {
        match code {
            1 => Self::FloorRequest,
            2 => Self::FloorRelease,
            3 => Self::FloorRequestQuery,
            4 => Self::FloorRequestStatus,
            5 => Self::UserQuery,
            6 => Self::UserStatus,
            7 => Self::FloorQuery,
            8 => Self::FloorStatus,
            9 => Self::ChairAction,
            10 => Self::ChairActionAck,
            11 => Self::Hello,
            12 => Self::HelloAck,
            13 => Self::Error,
            14 => Self::FloorRequestStatusAck,
            15 => Self::FloorStatusAck,
            16 => Self::Goodbye,
            17 => Self::GoodbyeAck,
            andere => Self::Unbekannt(andere),
        }
    }
}

impl From<Primitive> for u8 {
    fn from(primitive: Primitive) -> Self {
        primitive.code()
    }
}

impl std::fmt::Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbekannt(code) => write!(f, "Unbekannt({code})"),
            _ => f.write_str(self.name()),
        }
    }
}

/// Wert des REQUEST-STATUS-Attributs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Granted,
    Denied,
    Cancelled,
    Released,
    Revoked,
}

impl RequestStatus {
    /// Status einer Floor-Entscheidung: gewaehrt oder freigegeben
    pub fn aus_entscheidung(granted: bool) -> Self {
        if granted {
            Self::Granted
        } else {
            Self::Released
        }
    }

    /// Numerischer Wert im Attribut
    pub fn code(&self) -> u8 {
        match self {
            Self::Pending => 1,
            Self::Accepted => 2,
            Self::Granted => 3,
            Self::Denied => 4,
            Self::Cancelled => 5,
            Self::Released => 6,
            Self::Revoked => 7,
        }
    }
}

impl TryFrom<u8> for RequestStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Pending),
            2 => Ok(Self::Accepted),
            3 => Ok(Self::Granted),
            4 => Ok(Self::Denied),
            5 => Ok(Self::Cancelled),
            6 => Ok(Self::Released),
            7 => Ok(Self::Revoked),
            andere => Err(format!("Unbekannter Request-Status: {andere}")),
        }
    }
}

impl From<RequestStatus> for u8 {
    fn from(status: RequestStatus) -> Self {
        status.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_codes_stimmen_ueberein() {
        for code in 1..=17u8 {
            let p = Primitive::from(code);
            assert!(!matches!(p, Primitive::Unbekannt(_)), "Code {code} muss bekannt sein");
            assert_eq!(p.code(), code);
        }
    }

    #[test]
    fn unbekannter_code_bleibt_erhalten() {
        let p = Primitive::from(42);
        assert_eq!(p, Primitive::Unbekannt(42));
        assert_eq!(p.code(), 42);
        assert_eq!(p.to_string(), "Unbekannt(42)");
    }

    #[test]
    fn status_aus_entscheidung() {
        assert_eq!(RequestStatus::aus_entscheidung(true), RequestStatus::Granted);
        assert_eq!(RequestStatus::aus_entscheidung(false), RequestStatus::Released);
    }

    #[test]
    fn status_ungueltiger_code() {
        assert!(RequestStatus::try_from(0).is_err());
        assert!(RequestStatus::try_from(8).is_err());
        assert_eq!(RequestStatus::try_from(3), Ok(RequestStatus::Granted));
    }
}
