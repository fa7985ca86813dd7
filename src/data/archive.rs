//! Decoding of the NSKeyedArchiver blobs GameTrack stores for list columns.
//!
//! Core Data transformable attributes (`ZPLATFORMS`, `ZGENRES`, ...) are binary
//! plists with a `$objects` table. Entry 1 is the archived `NSArray`, whose
//! `NS.objects` holds UIDs pointing back into `$objects`.

use std::io::Cursor;

use plist::Value;

/// Decode an archived `NSArray` of strings. Anything undecodable yields an empty list.
pub fn decode_string_array(data: Option<&[u8]>) -> Vec<String> {
    let Some(data) = data.filter(|d| !d.is_empty()) else {
        return Vec::new();
    };

    let Ok(archive) = Value::from_reader(Cursor::new(data)) else {
        return Vec::new();
    };

    let Some(objects) = archive
        .as_dictionary()
        .and_then(|root| root.get("$objects"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    let Some(members) = objects
        .get(1)
        .and_then(Value::as_dictionary)
        .and_then(|array| array.get("NS.objects"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    members
        .iter()
        .filter_map(|member| match member {
            Value::Uid(uid) => usize::try_from(uid.get()).ok(),
            _ => None,
        })
        .filter_map(|idx| objects.get(idx).and_then(Value::as_string))
        .map(str::to_string)
        .collect()
}

/// Join a decoded list the way the CSV stores it
pub fn join_list(data: Option<&[u8]>) -> String {
    decode_string_array(data).join("|")
}
