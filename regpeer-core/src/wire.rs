//! Framing: 1-byte action tag, big-endian integers, NUL-terminated names.
//!
//! Outbound buffers grow as needed, so encoding has no overflow failure mode.
//! The only encode errors are names that cannot be NUL-terminated and listings
//! whose length does not fit the u32 count field.

use bytes::{Buf, BufMut};

use crate::listing::FileListing;
use crate::protocol::{
    Action, PeerId, PeerLocation, Request, SearchResult, ACTION_PUBLISH, JOIN_MSG_SIZE,
    PUBLISH_HEADER_SIZE, SEARCH_RESP_SIZE,
};

/// Encode a Join: tag 0 + peer id (BE).
pub fn encode_join(peer_id: PeerId) -> Vec<u8> {
    let mut out = Vec::with_capacity(JOIN_MSG_SIZE);
    out.put_u8(Action::Join.tag());
    out.put_u32(peer_id.get());
    out
}

/// Encode a Publish: tag 1 + file count (BE) + each name followed by NUL, in listing order.
pub fn encode_publish(listing: &FileListing) -> Result<Vec<u8>, FrameEncodeError> {
    let count = u32::try_from(listing.len()).map_err(|_| FrameEncodeError::TooManyFiles)?;
    let mut out = Vec::with_capacity(PUBLISH_HEADER_SIZE + listing.encoded_len());
    out.put_u8(Action::Publish.tag());
    out.put_u32(count);
    for name in listing.iter() {
        put_cstr(&mut out, name)?;
    }
    Ok(out)
}

/// Encode a Search: tag 2 + filename + NUL.
pub fn encode_search(filename: &[u8]) -> Result<Vec<u8>, FrameEncodeError> {
    let mut out = Vec::with_capacity(filename.len() + 2);
    out.put_u8(Action::Search.tag());
    put_cstr(&mut out, filename)?;
    Ok(out)
}

/// Encode any request.
pub fn encode_request(req: &Request) -> Result<Vec<u8>, FrameEncodeError> {
    match req {
        Request::Join { peer_id } => Ok(encode_join(*peer_id)),
        Request::Publish { filenames } => {
            encode_publish(&FileListing::from_names(filenames.iter().cloned()))
        }
        Request::Search { filename } => encode_search(filename),
    }
}

fn put_cstr(out: &mut Vec<u8>, name: &[u8]) -> Result<(), FrameEncodeError> {
    if name.contains(&0) {
        return Err(FrameEncodeError::EmbeddedNul(
            String::from_utf8_lossy(name).into_owned(),
        ));
    }
    out.put_slice(name);
    out.put_u8(0);
    Ok(())
}

/// Error encoding a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameEncodeError {
    #[error("filename contains a NUL byte: {0:?}")]
    EmbeddedNul(String),
    #[error("too many files for a u32 count")]
    TooManyFiles,
}

/// Decode the registry's reply to a Search. Input must be exactly [`SEARCH_RESP_SIZE`] bytes;
/// accumulating those bytes off the stream is the caller's job.
pub fn decode_search_response(bytes: &[u8]) -> Result<SearchResult, FrameDecodeError> {
    if bytes.len() != SEARCH_RESP_SIZE {
        return Err(FrameDecodeError::MalformedResponse { len: bytes.len() });
    }
    let mut buf = bytes;
    let peer_id = buf.get_u32();
    let mut ip = [0u8; 4];
    buf.copy_to_slice(&mut ip);
    let port = buf.get_u16();
    if peer_id == 0 && ip == [0; 4] && port == 0 {
        return Ok(SearchResult::NotFound);
    }
    Ok(SearchResult::Found(PeerLocation {
        peer_id: PeerId(peer_id),
        ip,
        port,
    }))
}

/// Encode a Search reply the way a registry sends it. `NotFound` is ten zero bytes.
pub fn encode_search_response(result: &SearchResult) -> [u8; SEARCH_RESP_SIZE] {
    let mut out = [0u8; SEARCH_RESP_SIZE];
    if let SearchResult::Found(loc) = result {
        let mut buf = &mut out[..];
        buf.put_u32(loc.peer_id.get());
        buf.put_slice(&loc.ip);
        buf.put_u16(loc.port);
    }
    out
}

/// Read the file count from a Publish message header.
pub fn decode_publish_header(bytes: &[u8]) -> Result<u32, FrameDecodeError> {
    if bytes.len() < PUBLISH_HEADER_SIZE {
        return Err(FrameDecodeError::NeedMore);
    }
    let mut buf = bytes;
    let tag = buf.get_u8();
    if tag != ACTION_PUBLISH {
        return Err(FrameDecodeError::UnexpectedAction(tag));
    }
    Ok(buf.get_u32())
}

/// Decode one request from the front of `bytes`. Returns the request and the number of bytes consumed.
/// Call with partial buffer; returns `NeedMore` if the message is not complete yet.
pub fn decode_request(bytes: &[u8]) -> Result<(Request, usize), FrameDecodeError> {
    let Some(&tag) = bytes.first() else {
        return Err(FrameDecodeError::NeedMore);
    };
    let action = Action::try_from(tag).map_err(FrameDecodeError::UnexpectedAction)?;
    match action {
        Action::Join => {
            if bytes.len() < JOIN_MSG_SIZE {
                return Err(FrameDecodeError::NeedMore);
            }
            let mut buf = &bytes[1..JOIN_MSG_SIZE];
            let peer_id = PeerId(buf.get_u32());
            Ok((Request::Join { peer_id }, JOIN_MSG_SIZE))
        }
        Action::Publish => {
            let count = decode_publish_header(bytes)? as usize;
            let mut pos = PUBLISH_HEADER_SIZE;
            let mut filenames = Vec::with_capacity(count.min(bytes.len() - pos));
            for _ in 0..count {
                let (name, used) = take_cstr(&bytes[pos..])?;
                filenames.push(name.to_vec());
                pos += used;
            }
            Ok((Request::Publish { filenames }, pos))
        }
        Action::Search => {
            let (name, used) = take_cstr(&bytes[1..])?;
            Ok((
                Request::Search {
                    filename: name.to_vec(),
                },
                1 + used,
            ))
        }
    }
}

fn take_cstr(bytes: &[u8]) -> Result<(&[u8], usize), FrameDecodeError> {
    let end = bytes
        .iter()
        .position(|&b| b == 0)
        .ok_or(FrameDecodeError::NeedMore)?;
    Ok((&bytes[..end], end + 1))
}

/// Error decoding a message (need more bytes, wrong size, or unknown tag).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameDecodeError {
    #[error("need more bytes")]
    NeedMore,
    #[error("malformed search response: expected 10 bytes, got {len}")]
    MalformedResponse { len: usize },
    #[error("unexpected action tag {0}")]
    UnexpectedAction(u8),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ACTION_JOIN, ACTION_SEARCH};

    fn split_names(payload: &[u8]) -> Vec<&[u8]> {
        let mut names: Vec<&[u8]> = payload.split(|&b| b == 0).collect();
        // Trailing NUL leaves one empty tail.
        assert_eq!(names.pop(), Some(&b""[..]));
        names
    }

    #[test]
    fn join_layout() {
        assert_eq!(encode_join(PeerId(42)), vec![0x00, 0x00, 0x00, 0x00, 0x2A]);
        assert_eq!(
            encode_join(PeerId(0x0102_0304)),
            vec![0x00, 0x01, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    fn join_peer_id_recoverable() {
        for id in [0u32, 1, 42, 0x8000_0000, u32::MAX] {
            let msg = encode_join(PeerId(id));
            assert_eq!(msg.len(), JOIN_MSG_SIZE);
            assert_eq!(u32::from_be_bytes([msg[1], msg[2], msg[3], msg[4]]), id);
        }
    }

    #[test]
    fn publish_layout() {
        let listing = FileListing::from_names(["a.txt", "b.txt"]);
        let msg = encode_publish(&listing).unwrap();
        let mut expected = vec![0x01, 0, 0, 0, 2];
        expected.extend_from_slice(b"a.txt\0b.txt\0");
        assert_eq!(msg, expected);
        assert_eq!(msg.len(), 18);
    }

    #[test]
    fn publish_empty_is_header_only() {
        let msg = encode_publish(&FileListing::new()).unwrap();
        assert_eq!(msg, vec![0x01, 0, 0, 0, 0]);
    }

    #[test]
    fn publish_header_count_matches_names() {
        let names = ["x", "report final.pdf", "z.tar.gz", "ümlaut.txt"];
        let msg = encode_publish(&FileListing::from_names(names)).unwrap();
        assert_eq!(decode_publish_header(&msg).unwrap() as usize, names.len());
        let recovered = split_names(&msg[PUBLISH_HEADER_SIZE..]);
        let expected: Vec<&[u8]> = names.iter().map(|n| n.as_bytes()).collect();
        assert_eq!(recovered, expected);
    }

    #[test]
    fn publish_rejects_embedded_nul() {
        let listing = FileListing::from_names([&b"ok"[..], b"bad\0name"]);
        assert!(matches!(
            encode_publish(&listing),
            Err(FrameEncodeError::EmbeddedNul(_))
        ));
    }

    #[test]
    fn search_layout() {
        let msg = encode_search(b"missing.txt").unwrap();
        assert_eq!(msg.len(), 2 + "missing.txt".len());
        assert_eq!(msg[0], ACTION_SEARCH);
        assert_eq!(&msg[1..12], b"missing.txt");
        assert_eq!(msg[12], 0);
        assert!(encode_search(b"a\0b").is_err());
    }

    #[test]
    fn search_response_zero_is_not_found() {
        assert_eq!(
            decode_search_response(&[0u8; SEARCH_RESP_SIZE]).unwrap(),
            SearchResult::NotFound
        );
    }

    #[test]
    fn search_response_found() {
        let bytes = [0, 0, 0, 7, 127, 0, 0, 1, 0x23, 0x28];
        let result = decode_search_response(&bytes).unwrap();
        let loc = result.location().copied().unwrap();
        assert_eq!(loc.peer_id, PeerId(7));
        assert_eq!(loc.port, 9000);
        assert_eq!(loc.to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn search_response_any_nonzero_byte_is_found() {
        for i in 0..SEARCH_RESP_SIZE {
            let mut bytes = [0u8; SEARCH_RESP_SIZE];
            bytes[i] = 0x80;
            let loc = match decode_search_response(&bytes).unwrap() {
                SearchResult::Found(loc) => loc,
                SearchResult::NotFound => panic!("byte {i} set but decoded NotFound"),
            };
            assert_eq!(loc.peer_id.get(), u32::from_be_bytes(bytes[0..4].try_into().unwrap()));
            assert_eq!(loc.ip, <[u8; 4]>::try_from(&bytes[4..8]).unwrap());
            assert_eq!(loc.port, u16::from_be_bytes([bytes[8], bytes[9]]));
        }
    }

    #[test]
    fn search_response_zero_ip_with_id_is_found() {
        let bytes = [0, 0, 0, 1, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            decode_search_response(&bytes).unwrap(),
            SearchResult::Found(PeerLocation { ip: [0, 0, 0, 0], .. })
        ));
    }

    #[test]
    fn search_response_wrong_size() {
        assert_eq!(
            decode_search_response(&[0u8; 9]),
            Err(FrameDecodeError::MalformedResponse { len: 9 })
        );
        assert_eq!(
            decode_search_response(&[0u8; 11]),
            Err(FrameDecodeError::MalformedResponse { len: 11 })
        );
        assert!(decode_search_response(&[]).is_err());
    }

    #[test]
    fn search_response_encoding_matches_decoder() {
        let found = SearchResult::Found(PeerLocation {
            peer_id: PeerId(7),
            ip: [127, 0, 0, 1],
            port: 9000,
        });
        assert_eq!(
            encode_search_response(&found),
            [0, 0, 0, 7, 127, 0, 0, 1, 0x23, 0x28]
        );
        assert_eq!(encode_search_response(&SearchResult::NotFound), [0u8; 10]);
    }

    #[test]
    fn partial_request_need_more() {
        let msg = encode_publish(&FileListing::from_names(["a.txt", "b.txt"])).unwrap();
        for cut in 0..msg.len() {
            assert_eq!(
                decode_request(&msg[..cut]),
                Err(FrameDecodeError::NeedMore),
                "cut at {cut}"
            );
        }
        let join = encode_join(PeerId(1));
        assert_eq!(decode_request(&join[..4]), Err(FrameDecodeError::NeedMore));
        assert_eq!(decode_request(b"\x02abc"), Err(FrameDecodeError::NeedMore));
    }

    #[test]
    fn unknown_tag_rejected() {
        assert_eq!(
            decode_request(&[9, 0, 0, 0, 0]),
            Err(FrameDecodeError::UnexpectedAction(9))
        );
        assert_eq!(
            decode_publish_header(&encode_join(PeerId(1))),
            Err(FrameDecodeError::UnexpectedAction(ACTION_JOIN))
        );
    }

    #[test]
    fn multiple_requests() {
        let mut buf = Vec::new();
        buf.extend(encode_join(PeerId(42)));
        buf.extend(encode_publish(&FileListing::from_names(["a.txt"])).unwrap());
        buf.extend(encode_search(b"a.txt").unwrap());

        let (r1, n1) = decode_request(&buf).unwrap();
        assert_eq!(r1, Request::Join { peer_id: PeerId(42) });
        let (r2, n2) = decode_request(&buf[n1..]).unwrap();
        assert_eq!(
            r2,
            Request::Publish {
                filenames: vec![b"a.txt".to_vec()]
            }
        );
        let (r3, n3) = decode_request(&buf[n1 + n2..]).unwrap();
        assert_eq!(
            r3,
            Request::Search {
                filename: b"a.txt".to_vec()
            }
        );
        assert_eq!(n1 + n2 + n3, buf.len());
    }

    #[test]
    fn encode_request_dispatches_by_action() {
        let req = Request::Publish {
            filenames: vec![b"a.txt".to_vec(), b"b.txt".to_vec()],
        };
        let bytes = encode_request(&req).unwrap();
        assert_eq!(bytes.len(), 18);
        assert_eq!(decode_request(&bytes).unwrap(), (req, 18));
    }
}
