//! Typed cursors over raw driver cursors.
//!
//! A `find` returns the driver's own cursor yielding raw documents; the
//! repository wraps it in a [`Cursor`] (blocking) or [`AsyncCursor`]
//! (async) that runs each document through
//! [`Record::from_document_with`] as it is yielded. Single forward pass,
//! never restartable, and fine over result sets that do not fit in memory.
//!
//! Decode failures surface in-stream as `Err` items; the cursor itself
//! keeps going, so a caller may skip a malformed document and read on.

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use bson::Document;
use futures::Stream;

use crate::document::{DecodeOptions, Record};
use crate::error::{DriverError, OdmResult};

/// Blocking typed cursor: an [`Iterator`] of decoded records.
pub struct Cursor<C, R> {
    inner: C,
    options: DecodeOptions,
    _marker: PhantomData<fn() -> R>,
}

impl<C, R> Cursor<C, R> {
    pub(crate) fn new(inner: C, options: DecodeOptions) -> Self {
        Cursor {
            inner,
            options,
            _marker: PhantomData,
        }
    }

    /// Unwraps the underlying driver cursor, abandoning typed decoding.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C, R> Iterator for Cursor<C, R>
where
    C: Iterator<Item = Result<Document, DriverError>>,
    R: Record,
{
    type Item = OdmResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.next()? {
            Ok(document) => Some(R::from_document_with(document, &self.options)),
            Err(err) => Some(Err(err.into())),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Async typed cursor: a [`Stream`] of decoded records.
pub struct AsyncCursor<C, R> {
    inner: C,
    options: DecodeOptions,
    _marker: PhantomData<fn() -> R>,
}

impl<C, R> AsyncCursor<C, R> {
    pub(crate) fn new(inner: C, options: DecodeOptions) -> Self {
        AsyncCursor {
            inner,
            options,
            _marker: PhantomData,
        }
    }

    /// Unwraps the underlying driver cursor, abandoning typed decoding.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C, R> Stream for AsyncCursor<C, R>
where
    C: Stream<Item = Result<Document, DriverError>> + Unpin,
    R: Record,
{
    type Item = OdmResult<R>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(document))) => {
                Poll::Ready(Some(R::from_document_with(document, &this.options)))
            }
            Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err.into()))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{FromBson, ToBson};
    use crate::document::{FieldSpec, decode_field};
    use crate::error::OdmError;
    use bson::doc;
    use futures::StreamExt;

    #[derive(Debug, Clone, PartialEq)]
    struct Reading {
        value: i32,
    }

    impl Record for Reading {
        fn record_name() -> &'static str {
            "Reading"
        }

        fn fields() -> &'static [FieldSpec<Self>] {
            static FIELDS: [FieldSpec<Reading>; 1] = [FieldSpec {
                name: "value",
                rename: None,
                unique: false,
                get: |record| record.value.to_bson(),
                set: |record, value| {
                    record.value = FromBson::from_bson(value)?;
                    Ok(())
                },
            }];
            &FIELDS
        }

        fn from_document_with(mut document: Document, options: &DecodeOptions) -> OdmResult<Self> {
            Ok(Self {
                value: decode_field::<Self, _>(&mut document, "value", None, options)?,
            })
        }
    }

    #[test]
    fn decodes_each_yielded_document() {
        let raw = vec![Ok(doc! { "value": 1 }), Ok(doc! { "value": 2 })];
        let cursor: Cursor<_, Reading> = Cursor::new(raw.into_iter(), DecodeOptions::default());
        let readings: Vec<Reading> = cursor.collect::<OdmResult<_>>().unwrap();
        assert_eq!(
            readings,
            vec![Reading { value: 1 }, Reading { value: 2 }]
        );
    }

    #[test]
    fn surfaces_errors_in_stream_and_keeps_going() {
        let raw = vec![
            Ok(doc! { "value": 1 }),
            Err(DriverError::new("connection reset")),
            Ok(doc! { "value": "not a number" }),
            Ok(doc! { "value": 4 }),
        ];
        let mut cursor: Cursor<_, Reading> = Cursor::new(raw.into_iter(), DecodeOptions::default());

        assert_eq!(cursor.next().unwrap().unwrap(), Reading { value: 1 });
        assert!(matches!(
            cursor.next().unwrap().unwrap_err(),
            OdmError::Driver(_)
        ));
        assert!(matches!(
            cursor.next().unwrap().unwrap_err(),
            OdmError::Conversion(_)
        ));
        assert_eq!(cursor.next().unwrap().unwrap(), Reading { value: 4 });
        assert!(cursor.next().is_none());
    }

    #[test]
    fn async_cursor_decodes_a_stream() {
        let raw = futures::stream::iter(vec![Ok(doc! { "value": 7 }), Ok(doc! { "value": 8 })]);
        let cursor: AsyncCursor<_, Reading> = AsyncCursor::new(raw, DecodeOptions::default());
        let readings: Vec<OdmResult<Reading>> =
            futures::executor::block_on(cursor.collect::<Vec<_>>());
        assert_eq!(readings.len(), 2);
        assert_eq!(*readings[0].as_ref().unwrap(), Reading { value: 7 });
        assert_eq!(*readings[1].as_ref().unwrap(), Reading { value: 8 });
    }
}
