//! The typed room record used by the booking facade.

use crate::error::{DbError, DbResult};
use crate::types::RecordRow;

/// A hotel room vacancy record.
///
/// Field order matches the on-disk schema: name, location, size, smoking,
/// rate, date, owner. The trailing owner field holds the id of the
/// customer who booked the room; an empty owner means unbooked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// The name of the hotel this vacancy record relates to.
    pub name: String,
    /// The location of the hotel.
    pub location: String,
    /// Maximum number of occupants, as a decimal string.
    pub size: String,
    /// `"Y"` for a smoking room, `"N"` for non-smoking.
    pub smoking: String,
    /// Charge per night, including the currency symbol.
    pub rate: String,
    /// The single night this record relates to, `yyyy/MM/dd`.
    pub date: String,
    /// Customer id of the booking, or empty if unbooked.
    pub owner: String,
    /// Row this record was read from, if any.
    row: Option<RecordRow>,
}

impl Room {
    /// Number of fields in a room record.
    pub const FIELD_COUNT: usize = 7;

    /// Position of the hotel name field.
    pub const NAME_FIELD: usize = 0;
    /// Position of the location field.
    pub const LOCATION_FIELD: usize = 1;
    /// Position of the room size field.
    pub const SIZE_FIELD: usize = 2;
    /// Position of the smoking field.
    pub const SMOKING_FIELD: usize = 3;
    /// Position of the rate field.
    pub const RATE_FIELD: usize = 4;
    /// Position of the date field.
    pub const DATE_FIELD: usize = 5;
    /// Position of the owner field.
    pub const OWNER_FIELD: usize = 6;

    /// Creates an unbooked room record.
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        size: impl Into<String>,
        smoking: impl Into<String>,
        rate: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            size: size.into(),
            smoking: smoking.into(),
            rate: rate.into(),
            date: date.into(),
            owner: String::new(),
            row: None,
        }
    }

    /// Returns the row this record was read from, if it came from a store.
    #[must_use]
    pub fn row(&self) -> Option<RecordRow> {
        self.row
    }

    /// Returns true if the room is booked (the owner field is non-blank).
    #[must_use]
    pub fn is_booked(&self) -> bool {
        !self.owner.trim().is_empty()
    }

    /// Converts the record into the positional field array the store uses.
    #[must_use]
    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.location.clone(),
            self.size.clone(),
            self.smoking.clone(),
            self.rate.clone(),
            self.date.clone(),
            self.owner.clone(),
        ]
    }

    /// Builds a record from the positional field array read at `row`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidField` if the array does not have exactly
    /// [`Room::FIELD_COUNT`] values.
    pub fn from_fields(row: RecordRow, fields: &[String]) -> DbResult<Self> {
        if fields.len() != Self::FIELD_COUNT {
            return Err(DbError::invalid_field(
                "record",
                format!(
                    "expected {} field values, got {}",
                    Self::FIELD_COUNT,
                    fields.len()
                ),
            ));
        }

        Ok(Self {
            name: fields[Self::NAME_FIELD].clone(),
            location: fields[Self::LOCATION_FIELD].clone(),
            size: fields[Self::SIZE_FIELD].clone(),
            smoking: fields[Self::SMOKING_FIELD].clone(),
            rate: fields[Self::RATE_FIELD].clone(),
            date: fields[Self::DATE_FIELD].clone(),
            owner: fields[Self::OWNER_FIELD].clone(),
            row: Some(row),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Room {
        Room::new("Elm", "Reno", "4", "Y", "$99.50", "2024/05/01")
    }

    #[test]
    fn new_room_is_unbooked() {
        let room = sample();
        assert!(!room.is_booked());
        assert!(room.row().is_none());
    }

    #[test]
    fn fields_round_trip() {
        let room = sample();
        let fields = room.to_fields();
        assert_eq!(fields.len(), Room::FIELD_COUNT);
        assert_eq!(fields[Room::NAME_FIELD], "Elm");
        assert_eq!(fields[Room::OWNER_FIELD], "");

        let back = Room::from_fields(RecordRow::new(74), &fields).unwrap();
        assert_eq!(back.name, room.name);
        assert_eq!(back.date, room.date);
        assert_eq!(back.row(), Some(RecordRow::new(74)));
    }

    #[test]
    fn from_fields_rejects_wrong_arity() {
        let result = Room::from_fields(RecordRow::new(0), &["Elm".to_string()]);
        assert!(matches!(result, Err(DbError::InvalidField { .. })));
    }

    #[test]
    fn booked_when_owner_set() {
        let mut room = sample();
        room.owner = "12345678".to_string();
        assert!(room.is_booked());

        // Whitespace does not count as a booking.
        room.owner = "   ".to_string();
        assert!(!room.is_booked());
    }
}
