//! Closed enums for the per-sequence policies and their config selectors.

use crate::error::StaircaseError;

/// A policy selector as it arrives from configuration: a numeric code or a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Code(i64),
    Name(String),
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code(c) => write!(f, "code {c}"),
            Self::Name(n) => write!(f, "name {n:?}"),
        }
    }
}

impl From<i64> for Selector {
    fn from(code: i64) -> Self {
        Self::Code(code)
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

/// Shared code/name mapping for the three policy enums.
macro_rules! policy_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $what:literal, fallback = $fallback:ident,
        { $($variant:ident = $code:literal, $label:literal;)+ }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub const fn code(self) -> i64 {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            pub fn from_code(code: i64) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                let wanted = name.trim().to_ascii_lowercase();
                match wanted.as_str() {
                    $($label => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Resolve a selector; an unknown value yields the fallback variant
            /// together with the error to report.
            pub fn resolve(selector: &Selector) -> (Self, Option<StaircaseError>) {
                let found = match selector {
                    Selector::Code(c) => Self::from_code(*c),
                    Selector::Name(n) => Self::from_name(n),
                };
                match found {
                    Some(v) => (v, None),
                    None => (
                        $name::$fallback,
                        Some(StaircaseError::UnknownCode {
                            what: $what,
                            value: selector.to_string(),
                            fallback: $name::$fallback.name(),
                        }),
                    ),
                }
            }
        }

        impl From<$name> for Selector {
            fn from(v: $name) -> Self {
                Selector::Code(v.code())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

policy_enum! {
    /// How a sequence moves its parameter between trials.
    Procedure, "procedure", fallback = NonAdaptive,
    {
        NonAdaptive = 0, "non_adaptive";
        NonChanging = 1, "non_changing";
        Up1Down1 = 2, "up1_down1";
        Up1Down2 = 3, "up1_down2";
        Up1Down3 = 4, "up1_down3";
        DelayedUp1Down1 = 5, "delayed_up1_down1";
    }
}

policy_enum! {
    /// When a sequence terminates.
    StoppingRule, "stopping rule", fallback = DontStop,
    {
        DontStop = 0, "dont_stop";
        Turnpoints = 1, "turnpoints";
        TurnpointsAtMinimum = 2, "turnpoints_at_minimum";
        StopKeyResponse = 3, "stop_key_response";
    }
}

policy_enum! {
    /// How the threshold is estimated after the run.
    ResultMethod, "result method", fallback = TurnpointMean,
    {
        TurnpointMean = 0, "turnpoint_mean";
        TailMean = 1, "tail_mean";
        Logistic = 2, "logistic";
        Weibull = 3, "weibull";
        Gumbel = 4, "gumbel";
        IsotonicRegression = 5, "isotonic_regression";
    }
}

impl Procedure {
    /// Whether the sequence moves its parameter at all.
    pub const fn is_adaptive(self) -> bool {
        !matches!(self, Self::NonAdaptive | Self::NonChanging)
    }
}

impl StoppingRule {
    pub const fn counts_turnpoints(self) -> bool {
        matches!(self, Self::Turnpoints | Self::TurnpointsAtMinimum)
    }
}

/// Response key codes, fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseCodes {
    pub yes: i64,
    pub no: i64,
    pub stop: i64,
}

impl Default for ResponseCodes {
    fn default() -> Self {
        Self {
            yes: 1,
            no: 2,
            stop: 27,
        }
    }
}

/// A raw response code resolved against the run's `ResponseCodes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Yes,
    No,
    Stop,
    Invalid(i64),
}

impl ResponseCodes {
    pub fn classify(&self, code: i64) -> Response {
        if code == self.yes {
            Response::Yes
        } else if code == self.no {
            Response::No
        } else if code == self.stop {
            Response::Stop
        } else {
            Response::Invalid(code)
        }
    }

    /// 1.0 for yes, 0.0 for no, `None` for anything else.
    pub fn as_binary(&self, code: i64) -> Option<f64> {
        match self.classify(code) {
            Response::Yes => Some(1.0),
            Response::No => Some(0.0),
            _ => None,
        }
    }
}
