use std::collections::HashMap;

use crate::domain::{Book, BookId, LibraryId};

/// 書籍エンティティストア
///
/// 選択中ライブラリの書籍集合をクライアント側で保持する唯一の入れ物。
/// ライブラリ切り替え時に破棄・再取得される。
/// 書き込みはMutation Coordinatorのみが行う（単一書き込み者の規律）。
#[derive(Debug, Clone)]
pub struct BookStore {
    library_id: LibraryId,
    books: HashMap<BookId, Book>,
}

impl BookStore {
    pub fn new(library_id: LibraryId) -> Self {
        Self {
            library_id,
            books: HashMap::new(),
        }
    }

    /// サーバーから取得した書籍一覧でストアを構築する
    pub fn from_books(library_id: LibraryId, books: Vec<Book>) -> Self {
        let mut store = Self::new(library_id);
        for book in books {
            store.upsert(book);
        }
        store
    }

    pub fn library_id(&self) -> LibraryId {
        self.library_id
    }

    pub fn get(&self, book_id: BookId) -> Option<&Book> {
        self.books.get(&book_id)
    }

    pub fn contains(&self, book_id: BookId) -> bool {
        self.books.contains_key(&book_id)
    }

    /// 書籍を挿入または置き換える
    ///
    /// サーバー確認済みレコードで楽観的状態を上書きする際にも使用される。
    pub fn upsert(&mut self, book: Book) {
        self.books.insert(book.id, book);
    }

    pub fn remove(&mut self, book_id: BookId) -> Option<Book> {
        self.books.remove(&book_id)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// 登録日時順の書籍一覧
    pub fn list(&self) -> Vec<Book> {
        let mut books: Vec<Book> = self.books.values().cloned().collect();
        books.sort_by(|a, b| a.added_at.cmp(&b.added_at).then(a.id.value().cmp(&b.id.value())));
        books
    }
}
