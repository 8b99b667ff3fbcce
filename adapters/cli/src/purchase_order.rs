use std::{error::Error, fmt, num::ParseFloatError, str::FromStr};

use hexa_core::{ArchetypeKey, Point};

/// Separates the archetype from the click coordinates.
const POSITION_DELIMITER: char = '@';
/// Separates the x and y coordinates.
const COORDINATE_DELIMITER: char = ',';

/// Purchase requested on the command line as `<archetype>@<x>,<y>`.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PurchaseOrder {
    /// Archetype to buy.
    pub(crate) archetype: ArchetypeKey,
    /// World-space point the purchase is placed nearest to.
    pub(crate) at: Point,
}

impl FromStr for PurchaseOrder {
    type Err = PurchaseOrderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(PurchaseOrderError::Empty);
        }

        let (archetype, position) = trimmed
            .split_once(POSITION_DELIMITER)
            .ok_or(PurchaseOrderError::MissingPosition)?;
        let archetype = archetype.trim();
        if archetype.is_empty() {
            return Err(PurchaseOrderError::MissingArchetype);
        }

        let (x, y) = position
            .split_once(COORDINATE_DELIMITER)
            .ok_or_else(|| PurchaseOrderError::InvalidPosition(position.to_owned()))?;
        let x = parse_coordinate(x)?;
        let y = parse_coordinate(y)?;

        Ok(Self {
            archetype: ArchetypeKey::new(archetype),
            at: Point::new(x, y),
        })
    }
}

/// Errors that can occur while parsing a purchase order.
#[derive(Debug, PartialEq)]
pub(crate) enum PurchaseOrderError {
    /// The order was empty or contained only whitespace.
    Empty,
    /// No `@` separated the archetype from the position.
    MissingPosition,
    /// Nothing preceded the `@`.
    MissingArchetype,
    /// The position was not two comma separated values.
    InvalidPosition(String),
    /// A coordinate was not a finite number.
    InvalidCoordinate(ParseFloatError),
    /// A coordinate parsed to infinity or NaN.
    NonFiniteCoordinate(String),
}

impl fmt::Display for PurchaseOrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "purchase order was empty"),
            Self::MissingPosition => {
                write!(f, "purchase order must look like <archetype>@<x>,<y>")
            }
            Self::MissingArchetype => write!(f, "purchase order is missing the archetype"),
            Self::InvalidPosition(position) => {
                write!(f, "could not parse position '{position}'")
            }
            Self::InvalidCoordinate(error) => write!(f, "could not parse coordinate: {error}"),
            Self::NonFiniteCoordinate(value) => {
                write!(f, "coordinate '{value}' is not a finite number")
            }
        }
    }
}

impl Error for PurchaseOrderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidCoordinate(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_coordinate(value: &str) -> Result<f32, PurchaseOrderError> {
    let trimmed = value.trim();
    let parsed = trimmed
        .parse::<f32>()
        .map_err(PurchaseOrderError::InvalidCoordinate)?;
    if !parsed.is_finite() {
        return Err(PurchaseOrderError::NonFiniteCoordinate(trimmed.to_owned()));
    }
    Ok(parsed)
}
