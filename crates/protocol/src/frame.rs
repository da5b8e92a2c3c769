use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Cursor;
use stashdb_common::{MAX_FRAME_SIZE, ProtocolError};

/// Um frame do protocolo: um documento JSON terminado por `\n`.
///
/// O conteúdo guardado não inclui o terminador (nem um `\r` opcional).
#[derive(Debug, Clone, PartialEq)]
pub struct Frame(Bytes);

impl Frame {
    /// Verifica se uma linha completa está disponível no buffer sem alocar.
    /// Retorna Ok(()) se completo, Err(Incomplete) se precisa mais dados.
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<(), ProtocolError> {
        let start = src.position() as usize;
        let buf = &src.get_ref()[start..];

        match buf.iter().position(|&b| b == b'\n') {
            Some(len) if len > MAX_FRAME_SIZE => Err(ProtocolError::FrameTooLarge(len)),
            Some(len) => {
                src.set_position((start + len + 1) as u64);
                Ok(())
            }
            None if buf.len() > MAX_FRAME_SIZE => Err(ProtocolError::FrameTooLarge(buf.len())),
            None => Err(ProtocolError::Incomplete),
        }
    }

    /// Extrai a próxima linha completa do cursor, avançando-o.
    /// Não valida o JSON: isso fica para quem decodifica o frame.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Frame, ProtocolError> {
        let start = src.position() as usize;
        Frame::check(src)?;
        let end = src.position() as usize - 1;

        let mut line = &src.get_ref()[start..end];
        if let Some(stripped) = line.strip_suffix(b"\r") {
            line = stripped;
        }
        Ok(Frame(Bytes::copy_from_slice(line)))
    }

    /// Encoda o frame no buffer de saída, com o terminador.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put(self.0.as_ref());
        dst.put_u8(b'\n');
    }

    /// Serializa `value` como JSON de uma linha.
    pub fn from_json<T: Serialize>(value: &T) -> Result<Frame, ProtocolError> {
        let data =
            serde_json::to_vec(value).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
        Ok(Frame(Bytes::from(data)))
    }

    pub fn to_json<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_slice(&self.0).map_err(|e| ProtocolError::InvalidJson(e.to_string()))
    }

    /// Linha em branco (só espaços); conexões simplesmente a ignoram.
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(u8::is_ascii_whitespace)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Frame {
    fn from(s: &str) -> Self {
        Frame(Bytes::from(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stashdb_common::Element;

    fn parse_all(data: &[u8]) -> Vec<Frame> {
        let mut cursor = Cursor::new(data);
        let mut frames = Vec::new();
        while let Ok(frame) = Frame::parse(&mut cursor) {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn encode_then_parse_line() {
        let frame = Frame::from(r#"{"op":"keys"}"#);
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        assert_eq!(&buf[..], b"{\"op\":\"keys\"}\n");

        let mut cursor = Cursor::new(&buf[..]);
        Frame::check(&mut cursor).unwrap();
        cursor.set_position(0);
        assert_eq!(Frame::parse(&mut cursor).unwrap(), frame);
    }

    #[test]
    fn multiple_lines_in_one_buffer() {
        let frames = parse_all(b"{\"a\":1}\n{\"b\":2}\r\n{\"c\"");
        assert_eq!(frames, vec![Frame::from("{\"a\":1}"), Frame::from("{\"b\":2}")]);
    }

    #[test]
    fn incomplete_line() {
        let data = b"{\"op\":\"get\""; // sem \n
        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(
            Frame::check(&mut cursor),
            Err(ProtocolError::Incomplete)
        ));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn invalid_utf8_fails_at_decode() {
        let data = b"\"\xff\xfe\"\n";
        let mut cursor = Cursor::new(&data[..]);
        let frame = Frame::parse(&mut cursor).unwrap();
        assert!(matches!(
            frame.to_json::<Element>(),
            Err(ProtocolError::InvalidJson(_))
        ));
    }

    #[test]
    fn blank_line() {
        let frames = parse_all(b"  \n");
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_blank());
    }

    #[test]
    fn json_helpers() {
        let element = Element::List(vec![Element::from("One"), Element::Int(2)]);
        let frame = Frame::from_json(&element).unwrap();
        assert_eq!(frame.as_bytes(), br#"["One",2]"#);
        assert_eq!(frame.to_json::<Element>().unwrap(), element);

        let bad = Frame::from("{not json");
        assert!(matches!(
            bad.to_json::<Element>(),
            Err(ProtocolError::InvalidJson(_))
        ));
    }
}
