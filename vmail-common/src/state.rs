/*
 * vMail mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 *  This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
 **/
/// where a mail goes next in the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(into = "String")]
#[serde(from = "String")]
pub enum State {
    /// dispatch to the processor with this name.
    Processor(String),
    /// discard silently.
    Ghost,
    /// route to the error processor.
    Error,
}

impl State {
    /// default name of the first processor a mail enters.
    pub const ROOT: &'static str = "root";
    /// reserved name of the discard state.
    pub const GHOST: &'static str = "ghost";
    /// reserved name of the error state.
    pub const ERROR: &'static str = "error";

    /// is this a terminal marker (ghost / error) ?
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Ghost | Self::Error)
    }

    /// the processor name, if any.
    #[must_use]
    pub fn processor(&self) -> Option<&str> {
        match self {
            Self::Processor(name) => Some(name),
            Self::Ghost | Self::Error => None,
        }
    }

    /// is `name` reserved for a terminal marker ?
    #[must_use]
    pub fn is_reserved(name: &str) -> bool {
        name == Self::GHOST || name == Self::ERROR
    }
}

impl Default for State {
    fn default() -> Self {
        Self::Processor(Self::ROOT.to_string())
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            State::Processor(name) => name,
            State::Ghost => Self::GHOST,
            State::Error => Self::ERROR,
        })
    }
}

impl From<State> for String {
    fn from(state: State) -> Self {
        format!("{}", state)
    }
}

impl From<String> for State {
    fn from(value: String) -> Self {
        match value.as_str() {
            Self::GHOST => Self::Ghost,
            Self::ERROR => Self::Error,
            _ => Self::Processor(value),
        }
    }
}

impl From<&str> for State {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}
